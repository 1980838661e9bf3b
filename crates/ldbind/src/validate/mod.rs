//! Input constraint validation.
//!
//! Mirrors the constraint validation a numeric or date input performs before
//! its value is accepted. A field whose input fails these checks skips its
//! commit without reporting an error.
//!
//! Empty input is valid: it clears the value.

use crate::codec::FieldText;
use crate::model::DataType;
use crate::util::datetime::is_valid_local_minutes;

/// Returns true if `text` satisfies the input constraints of `data_type`.
///
/// Types without input constraints (strings, URLs, booleans) always pass.
pub fn validate_input(data_type: DataType, text: &FieldText) -> bool {
    let raw = match text {
        FieldText::Checked(_) => return true,
        FieldText::Text(s) => s.trim(),
    };
    if !data_type.is_constrained() || raw.is_empty() {
        return true;
    }
    match data_type {
        DataType::Integer => raw.parse::<i64>().is_ok(),
        DataType::Decimal => raw.parse::<f64>().map(f64::is_finite).unwrap_or(false),
        DataType::Datetime => is_valid_local_minutes(raw),
        DataType::String | DataType::Boolean | DataType::Url => true,
    }
}
