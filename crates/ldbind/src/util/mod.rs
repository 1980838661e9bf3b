//! Utility modules.

pub mod datetime;

pub use datetime::{
    format_datetime_rfc3339, format_local_minutes, is_valid_local_minutes, join_local,
    parse_datetime_rfc3339, parse_local_minutes, split_local, DateTimeParseError,
};
