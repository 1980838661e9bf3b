//! Date/time text handling.
//!
//! Two text forms are used:
//! - RFC 3339 datetimes (`2024-03-15T14:30:00.5+05:30`) for stored values;
//! - minute-precision local datetimes (`2024-03-15T14:30`) for field input,
//!   optionally split into a date part (`2024-03-15`) and a time part (`14:30`).
//!
//! Internally a datetime is microseconds since Unix epoch plus an offset in minutes.

use thiserror::Error;

const MICROSECONDS_PER_SECOND: i64 = 1_000_000;
const MICROSECONDS_PER_MINUTE: i64 = 60 * MICROSECONDS_PER_SECOND;
const MICROSECONDS_PER_HOUR: i64 = 60 * MICROSECONDS_PER_MINUTE;
const MICROSECONDS_PER_DAY: i64 = 24 * MICROSECONDS_PER_HOUR;

/// Error type for date/time parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DateTimeParseError {
    pub message: String,
}

impl DateTimeParseError {
    fn invalid(what: &str, input: &str) -> Self {
        Self {
            message: format!("Invalid {}: {}", what, input),
        }
    }
}

/// Parses a timezone offset string (Z, +HH:MM, -HH:MM) and returns offset in minutes.
fn parse_timezone_offset(offset: &str) -> Result<i16, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }

    let bytes = offset.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return Err(DateTimeParseError::invalid("timezone offset", offset));
    }

    let sign = match bytes[0] {
        b'+' => 1i16,
        b'-' => -1i16,
        _ => return Err(DateTimeParseError::invalid("timezone offset", offset)),
    };

    let hours: i16 = parse_digits(&offset[1..3]).ok_or_else(|| DateTimeParseError::invalid("timezone offset", offset))?;
    let minutes: i16 = parse_digits(&offset[4..6]).ok_or_else(|| DateTimeParseError::invalid("timezone offset", offset))?;

    // +24:00 / -24:00 are the extremes
    if hours > 24 || (hours == 24 && minutes != 0) || minutes > 59 {
        return Err(DateTimeParseError::invalid("timezone offset", offset));
    }

    Ok(sign * (hours * 60 + minutes))
}

/// Formats an offset in minutes as a timezone string (Z, +HH:MM, -HH:MM).
fn format_timezone_offset(offset_min: i16) -> String {
    if offset_min == 0 {
        return "Z".to_string();
    }

    let sign = if offset_min >= 0 { '+' } else { '-' };
    let abs_offset = offset_min.abs();
    format!("{}{:02}:{:02}", sign, abs_offset / 60, abs_offset % 60)
}

/// Parses an all-ASCII-digit string. Rejects signs and whitespace that `str::parse` would accept.
fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Pads or truncates fractional seconds to microseconds.
fn parse_fractional_seconds(frac: &str) -> i64 {
    let mut padded: String = frac.chars().take(6).collect();
    while padded.len() < 6 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

/// Formats microseconds as fractional seconds, omitting them if zero.
fn format_fractional_seconds(us: i64) -> String {
    if us == 0 {
        return String::new();
    }
    let digits = format!("{:06}", us);
    format!(".{}", digits.trim_end_matches('0'))
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since Unix epoch for a civil date (Howard Hinnant's `days_from_civil`).
fn date_to_days(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year as i64 - 1 } else { year as i64 };
    let m = month as i64;
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date for days since Unix epoch (Howard Hinnant's `civil_from_days`).
fn days_to_date(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = yoe + era * 400 + if m <= 2 { 1 } else { 0 };
    (y as i32, m, d)
}

/// Parses `YYYY-MM-DD` into days since Unix epoch.
fn parse_date_part(date: &str, input: &str) -> Result<i64, DateTimeParseError> {
    let bytes = date.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(DateTimeParseError::invalid("date", input));
    }

    let year: i32 = parse_digits(&date[..4]).ok_or_else(|| DateTimeParseError::invalid("year", input))?;
    let month: u32 = parse_digits(&date[5..7]).ok_or_else(|| DateTimeParseError::invalid("month", input))?;
    let day: u32 = parse_digits(&date[8..10]).ok_or_else(|| DateTimeParseError::invalid("day", input))?;

    if !(1..=12).contains(&month) {
        return Err(DateTimeParseError::invalid("month", input));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(DateTimeParseError::invalid("day", input));
    }

    Ok(date_to_days(year, month, day))
}

/// Parses `HH:MM` into microseconds since midnight.
fn parse_clock_part(clock: &str, input: &str) -> Result<i64, DateTimeParseError> {
    let bytes = clock.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(DateTimeParseError::invalid("time", input));
    }

    let hours: i64 = parse_digits(&clock[..2]).ok_or_else(|| DateTimeParseError::invalid("hours", input))?;
    let minutes: i64 = parse_digits(&clock[3..5]).ok_or_else(|| DateTimeParseError::invalid("minutes", input))?;

    if hours > 23 {
        return Err(DateTimeParseError::invalid("hours", input));
    }
    if minutes > 59 {
        return Err(DateTimeParseError::invalid("minutes", input));
    }

    Ok(hours * MICROSECONDS_PER_HOUR + minutes * MICROSECONDS_PER_MINUTE)
}

/// Splits local-time microseconds into (days, microseconds since midnight).
fn split_day(local_us: i64) -> (i64, i64) {
    (local_us.div_euclid(MICROSECONDS_PER_DAY), local_us.rem_euclid(MICROSECONDS_PER_DAY))
}

// =====================
// RFC 3339
// =====================

/// Parses an RFC 3339 datetime string and returns microseconds since Unix epoch
/// and offset in minutes.
///
/// A missing offset is read as UTC.
pub fn parse_datetime_rfc3339(datetime_str: &str) -> Result<(i64, i16), DateTimeParseError> {
    // Minimum length is 19 (YYYY-MM-DDTHH:MM:SS)
    if datetime_str.len() < 19 || !datetime_str.is_ascii() {
        return Err(DateTimeParseError::invalid("RFC 3339 datetime", datetime_str));
    }

    let sep = datetime_str.as_bytes()[10];
    if sep != b'T' && sep != b't' && sep != b' ' {
        return Err(DateTimeParseError::invalid("RFC 3339 datetime", datetime_str));
    }

    let days = parse_date_part(&datetime_str[..10], datetime_str)?;
    let clock_us = parse_clock_part(&datetime_str[11..16], datetime_str)?;

    if datetime_str.as_bytes()[16] != b':' {
        return Err(DateTimeParseError::invalid("RFC 3339 datetime", datetime_str));
    }
    let seconds: i64 = parse_digits(&datetime_str[17..19])
        .filter(|s| *s <= 59)
        .ok_or_else(|| DateTimeParseError::invalid("seconds", datetime_str))?;

    let rest = &datetime_str[19..];
    let (micros, offset_str) = match rest.strip_prefix('.') {
        Some(frac_and_tz) => {
            let frac_end = frac_and_tz
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(frac_and_tz.len());
            if frac_end == 0 {
                return Err(DateTimeParseError::invalid("fractional seconds", datetime_str));
            }
            (
                parse_fractional_seconds(&frac_and_tz[..frac_end]),
                &frac_and_tz[frac_end..],
            )
        }
        None => (0, rest),
    };

    let offset_min = if offset_str.is_empty() {
        0
    } else {
        parse_timezone_offset(offset_str)?
    };

    let local_us = days * MICROSECONDS_PER_DAY + clock_us + seconds * MICROSECONDS_PER_SECOND + micros;

    // local time = UTC + offset
    Ok((local_us - offset_min as i64 * MICROSECONDS_PER_MINUTE, offset_min))
}

/// Formats microseconds since Unix epoch as an RFC 3339 datetime string.
pub fn format_datetime_rfc3339(epoch_us: i64, offset_min: i16) -> String {
    let local_us = epoch_us + offset_min as i64 * MICROSECONDS_PER_MINUTE;
    let (days, time_us) = split_day(local_us);
    let (year, month, day) = days_to_date(days);

    let hours = time_us / MICROSECONDS_PER_HOUR;
    let minutes = (time_us % MICROSECONDS_PER_HOUR) / MICROSECONDS_PER_MINUTE;
    let seconds = (time_us % MICROSECONDS_PER_MINUTE) / MICROSECONDS_PER_SECOND;
    let micros = time_us % MICROSECONDS_PER_SECOND;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{}",
        year,
        month,
        day,
        hours,
        minutes,
        seconds,
        format_fractional_seconds(micros),
        format_timezone_offset(offset_min)
    )
}

// =====================
// Minute-precision local input
// =====================

/// Formats an instant as `YYYY-MM-DDTHH:MM` in the given UTC offset.
///
/// Seconds and below are truncated.
pub fn format_local_minutes(epoch_us: i64, offset_min: i16) -> String {
    let local_us = epoch_us + offset_min as i64 * MICROSECONDS_PER_MINUTE;
    let (days, time_us) = split_day(local_us);
    let (year, month, day) = days_to_date(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}",
        year,
        month,
        day,
        time_us / MICROSECONDS_PER_HOUR,
        (time_us % MICROSECONDS_PER_HOUR) / MICROSECONDS_PER_MINUTE
    )
}

/// Parses `YYYY-MM-DDTHH:MM` read in the given UTC offset.
///
/// Returns microseconds since Unix epoch and the offset.
pub fn parse_local_minutes(input: &str, offset_min: i16) -> Result<(i64, i16), DateTimeParseError> {
    if input.len() != 16 || !input.is_ascii() || input.as_bytes()[10] != b'T' {
        return Err(DateTimeParseError::invalid("local datetime", input));
    }
    let days = parse_date_part(&input[..10], input)?;
    let clock_us = parse_clock_part(&input[11..], input)?;
    let local_us = days * MICROSECONDS_PER_DAY + clock_us;
    Ok((local_us - offset_min as i64 * MICROSECONDS_PER_MINUTE, offset_min))
}

/// Splits `YYYY-MM-DDTHH:MM` into its date and time parts.
///
/// Text without a `T` separator is treated as a bare date.
pub fn split_local(input: &str) -> (String, String) {
    match input.split_once('T') {
        Some((date, time)) => (date.to_string(), time.to_string()),
        None => (input.to_string(), String::new()),
    }
}

/// Joins a date part and a time part into `YYYY-MM-DDTHH:MM`.
///
/// An empty time part defaults to midnight. An empty date part yields empty
/// text whatever the time part holds; callers keep the time part themselves.
pub fn join_local(date: &str, time: &str) -> String {
    if date.is_empty() {
        return String::new();
    }
    let time = if time.is_empty() { "00:00" } else { time };
    format!("{}T{}", date, time)
}

/// Returns true if `input` is a well-formed `YYYY-MM-DDTHH:MM` value.
pub fn is_valid_local_minutes(input: &str) -> bool {
    parse_local_minutes(input, 0).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_basic() {
        assert_eq!(parse_datetime_rfc3339("1970-01-01T00:00:00Z").unwrap(), (0, 0));
        assert_eq!(
            parse_datetime_rfc3339("2024-03-15T14:30:00Z").unwrap(),
            (1_710_513_000_000_000, 0)
        );
        assert_eq!(
            parse_datetime_rfc3339("2024-03-15T14:30:00.123456Z").unwrap(),
            (1_710_513_000_123_456, 0)
        );
        // No offset reads as UTC
        assert_eq!(
            parse_datetime_rfc3339("2024-03-15T14:30:00").unwrap(),
            (1_710_513_000_000_000, 0)
        );
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(format_datetime_rfc3339(0, 0), "1970-01-01T00:00:00Z");
        assert_eq!(format_datetime_rfc3339(1_710_513_000_500_000, 0), "2024-03-15T14:30:00.5Z");
    }

    #[test]
    fn test_datetime_roundtrip() {
        for s in [
            "1970-01-01T00:00:00Z",
            "2000-02-29T12:00:00Z",
            "2024-03-15T14:30:00.123456Z",
            "2024-03-15T14:30:00+05:30",
            "2024-12-31T23:59:59.999999-08:00",
        ] {
            let (us, off) = parse_datetime_rfc3339(s).unwrap();
            assert_eq!(format_datetime_rfc3339(us, off), s, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn test_datetime_with_offset_is_same_instant() {
        let (local, off) = parse_datetime_rfc3339("2024-03-15T14:30:00+05:30").unwrap();
        let (utc, _) = parse_datetime_rfc3339("2024-03-15T09:00:00Z").unwrap();
        assert_eq!(off, 330);
        assert_eq!(local, utc);
    }

    #[test]
    fn test_negative_epoch() {
        let (us, off) = parse_datetime_rfc3339("1969-12-31T23:59:59Z").unwrap();
        assert_eq!(us, -1_000_000);
        assert_eq!(format_datetime_rfc3339(us, off), "1969-12-31T23:59:59Z");
    }

    #[test]
    fn test_invalid_datetimes() {
        assert!(parse_datetime_rfc3339("2024-13-01T00:00:00Z").is_err());
        assert!(parse_datetime_rfc3339("2023-02-29T00:00:00Z").is_err());
        assert!(parse_datetime_rfc3339("2024-03-15T24:00:00Z").is_err());
        assert!(parse_datetime_rfc3339("2024-03-15T14:30:60Z").is_err());
        assert!(parse_datetime_rfc3339("2024-03-15T14:30:00+24:01").is_err());
        assert!(parse_datetime_rfc3339("2024-03-15T14:30:00.Z").is_err());
        assert!(parse_datetime_rfc3339("not a datetime at all").is_err());
    }

    #[test]
    fn test_local_minutes_truncates_seconds() {
        let (us, _) = parse_datetime_rfc3339("2024-03-15T14:30:45.25Z").unwrap();
        assert_eq!(format_local_minutes(us, 0), "2024-03-15T14:30");
        assert_eq!(format_local_minutes(us, 60), "2024-03-15T15:30");
        assert_eq!(format_local_minutes(us, -900), "2024-03-14T23:30");
    }

    #[test]
    fn test_local_minutes_roundtrip_in_offset() {
        let (us, off) = parse_local_minutes("2024-03-15T14:30", 120).unwrap();
        assert_eq!(off, 120);
        assert_eq!(format_datetime_rfc3339(us, 0), "2024-03-15T12:30:00Z");
        assert_eq!(format_local_minutes(us, off), "2024-03-15T14:30");
    }

    #[test]
    fn test_local_minutes_rejects_malformed() {
        assert!(!is_valid_local_minutes("2024-03-15"));
        assert!(!is_valid_local_minutes("2024-03-15T25:00"));
        assert!(!is_valid_local_minutes("2024-03-15 14:30"));
        assert!(!is_valid_local_minutes("2024-3-15T14:300"));
        assert!(is_valid_local_minutes("2024-03-15T14:30"));
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(
            split_local("2024-03-15T14:30"),
            ("2024-03-15".to_string(), "14:30".to_string())
        );
        assert_eq!(split_local(""), (String::new(), String::new()));
        assert_eq!(join_local("2024-03-15", "14:30"), "2024-03-15T14:30");
        assert_eq!(join_local("2024-03-15", ""), "2024-03-15T00:00");
        assert_eq!(join_local("", "14:30"), "");
    }
}
