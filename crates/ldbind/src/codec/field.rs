//! Conversion between typed values and the text a field edits.
//!
//! Booleans are edited as a checked/unchecked toggle; every other type as
//! text. Datetimes use minute-precision local time in the host's offset.

use crate::config::HostCapabilities;
use crate::model::{DataType, Datetime, TypedValue};
use crate::util::datetime::{format_local_minutes, parse_local_minutes, DateTimeParseError};

/// The external representation of a field's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldText {
    /// Free-text input.
    Text(String),
    /// Checkbox state.
    Checked(bool),
}

impl FieldText {
    /// The text, or `"true"`/`"false"` for a toggle.
    pub fn as_text(&self) -> &str {
        match self {
            FieldText::Text(s) => s,
            FieldText::Checked(true) => "true",
            FieldText::Checked(false) => "false",
        }
    }
}

/// Error parsing field text back into a typed value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldTextError {
    #[error("invalid {data_type} input: {input:?}")]
    Invalid { data_type: DataType, input: String },

    #[error(transparent)]
    Datetime(#[from] DateTimeParseError),
}

/// Encodes a resolved value as field text. A missing value is an empty field.
pub fn to_field_text(data_type: DataType, value: Option<&TypedValue>, host: &HostCapabilities) -> FieldText {
    if data_type == DataType::Boolean {
        return FieldText::Checked(matches!(value, Some(TypedValue::Boolean(true))));
    }
    let text = match value {
        None => String::new(),
        Some(TypedValue::String(s)) | Some(TypedValue::Url(s)) => s.clone(),
        Some(TypedValue::Boolean(b)) => b.to_string(),
        Some(TypedValue::Decimal(d)) => d.to_string(),
        Some(TypedValue::Integer(i)) => i.to_string(),
        Some(TypedValue::Datetime(dt)) => format_local_minutes(dt.epoch_us, host.utc_offset_min),
    };
    FieldText::Text(text)
}

/// Parses field text into the value to store.
///
/// `Ok(None)` means the field was emptied and the value should be cleared.
/// Strings are never cleared: empty text is an empty string.
pub fn parse_field_text(
    data_type: DataType,
    text: &FieldText,
    host: &HostCapabilities,
) -> Result<Option<TypedValue>, FieldTextError> {
    let raw = match text {
        FieldText::Checked(b) => return Ok(Some(TypedValue::Boolean(*b))),
        FieldText::Text(s) => s.as_str(),
    };

    let invalid = || FieldTextError::Invalid {
        data_type,
        input: raw.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() && data_type != DataType::String {
        return Ok(None);
    }

    let value = match data_type {
        DataType::String => TypedValue::String(raw.to_string()),
        DataType::Url => TypedValue::Url(trimmed.to_string()),
        DataType::Boolean => match trimmed {
            "true" => TypedValue::Boolean(true),
            "false" => TypedValue::Boolean(false),
            _ => return Err(invalid()),
        },
        DataType::Integer => TypedValue::Integer(trimmed.parse().map_err(|_| invalid())?),
        DataType::Decimal => {
            let d: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !d.is_finite() {
                return Err(invalid());
            }
            TypedValue::Decimal(d)
        }
        DataType::Datetime => {
            let (epoch_us, offset_min) = parse_local_minutes(trimmed, host.utc_offset_min)?;
            TypedValue::Datetime(Datetime::new(epoch_us, offset_min))
        }
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostCapabilities {
        HostCapabilities::default()
    }

    #[test]
    fn test_boolean_is_a_toggle() {
        assert_eq!(
            to_field_text(DataType::Boolean, Some(&TypedValue::Boolean(true)), &host()),
            FieldText::Checked(true)
        );
        assert_eq!(to_field_text(DataType::Boolean, None, &host()), FieldText::Checked(false));
        assert_eq!(FieldText::Checked(true).as_text(), "true");
    }

    #[test]
    fn test_numbers_use_decimal_strings() {
        assert_eq!(
            to_field_text(DataType::Decimal, Some(&TypedValue::Decimal(2.5)), &host()).as_text(),
            "2.5"
        );
        assert_eq!(
            to_field_text(DataType::Integer, Some(&TypedValue::Integer(-7)), &host()).as_text(),
            "-7"
        );
        assert_eq!(
            parse_field_text(DataType::Decimal, &FieldText::Text(" 2.50 ".into()), &host()),
            Ok(Some(TypedValue::Decimal(2.5)))
        );
        assert!(parse_field_text(DataType::Integer, &FieldText::Text("1.5".into()), &host()).is_err());
        assert!(parse_field_text(DataType::Decimal, &FieldText::Text("inf".into()), &host()).is_err());
    }

    #[test]
    fn test_datetime_text_in_host_offset() {
        let host = HostCapabilities { datetime_local: true, utc_offset_min: 60 };
        let dt = Datetime::parse("2024-03-15T14:30:59Z").unwrap();
        let text = to_field_text(DataType::Datetime, Some(&TypedValue::Datetime(dt)), &host);
        assert_eq!(text.as_text(), "2024-03-15T15:30");

        let parsed = parse_field_text(DataType::Datetime, &text, &host).unwrap();
        assert_eq!(
            parsed,
            Some(TypedValue::Datetime(Datetime::parse("2024-03-15T15:30:00+01:00").unwrap()))
        );
    }

    #[test]
    fn test_empty_text_clears_non_strings() {
        for ty in [DataType::Url, DataType::Integer, DataType::Decimal, DataType::Datetime] {
            assert_eq!(parse_field_text(ty, &FieldText::Text(String::new()), &host()), Ok(None));
        }
        assert_eq!(
            parse_field_text(DataType::String, &FieldText::Text(String::new()), &host()),
            Ok(Some(TypedValue::String(String::new())))
        );
    }
}
