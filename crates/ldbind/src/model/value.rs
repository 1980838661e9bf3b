//! Value types for node properties.
//!
//! [`Value`] is what a node stores; [`TypedValue`] is what a field reads and
//! writes once a [`DataType`] has been applied.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::PropertyId;
use crate::util::datetime::{format_datetime_rfc3339, parse_datetime_rfc3339, DateTimeParseError};

/// Declared data types a field can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Boolean,
    Datetime,
    Decimal,
    Integer,
    Url,
}

impl DataType {
    /// All declared types, in a stable order.
    pub const ALL: [DataType; 6] = [
        DataType::String,
        DataType::Boolean,
        DataType::Datetime,
        DataType::Decimal,
        DataType::Integer,
        DataType::Url,
    ];

    /// Parses a type name as used in field configuration (`"string"`, `"url"`, ...).
    pub fn from_name(name: &str) -> Option<DataType> {
        match name {
            "string" => Some(DataType::String),
            "boolean" => Some(DataType::Boolean),
            "datetime" => Some(DataType::Datetime),
            "decimal" => Some(DataType::Decimal),
            "integer" => Some(DataType::Integer),
            "url" => Some(DataType::Url),
            _ => None,
        }
    }

    /// Returns the configuration name of this type.
    pub fn name(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Datetime => "datetime",
            DataType::Decimal => "decimal",
            DataType::Integer => "integer",
            DataType::Url => "url",
        }
    }

    /// Whether input for this type goes through constraint validation before commit.
    pub fn is_constrained(self) -> bool {
        matches!(self, DataType::Datetime | DataType::Decimal | DataType::Integer)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instant with the UTC offset it was written in.
///
/// Serialized as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Datetime {
    /// Microseconds since Unix epoch (1970-01-01T00:00:00Z).
    pub epoch_us: i64,
    /// Signed UTC offset in minutes (e.g., +330 for +05:30).
    pub offset_min: i16,
}

impl Datetime {
    /// Creates a datetime from epoch microseconds and an offset.
    pub fn new(epoch_us: i64, offset_min: i16) -> Self {
        Self { epoch_us, offset_min }
    }

    /// Parses an RFC 3339 datetime string.
    pub fn parse(s: &str) -> Result<Self, DateTimeParseError> {
        let (epoch_us, offset_min) = parse_datetime_rfc3339(s)?;
        Ok(Self { epoch_us, offset_min })
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_datetime_rfc3339(self.epoch_us, self.offset_min))
    }
}

impl From<Datetime> for String {
    fn from(dt: Datetime) -> Self {
        dt.to_string()
    }
}

impl TryFrom<String> for Datetime {
    type Error = DateTimeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Datetime::parse(&s)
    }
}

/// A value as stored on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// String, optionally tagged with a locale (language tag).
    Text {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locale: Option<String>,
    },
    Boolean(bool),
    Datetime(Datetime),
    /// Decimal number (must be finite).
    Decimal(f64),
    Integer(i64),
    /// Reference to another resource.
    Url(String),
}

impl Value {
    /// Returns the data type this value decodes as.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Text { .. } => DataType::String,
            Value::Boolean(_) => DataType::Boolean,
            Value::Datetime(_) => DataType::Datetime,
            Value::Decimal(_) => DataType::Decimal,
            Value::Integer(_) => DataType::Integer,
            Value::Url(_) => DataType::Url,
        }
    }

    /// Validates value-level constraints.
    ///
    /// Returns an error description if invalid, None if valid.
    pub fn validate(&self) -> Option<&'static str> {
        match self {
            Value::Decimal(v) if !v.is_finite() => Some("decimal must be finite"),
            Value::Datetime(dt) if dt.offset_min < -1440 || dt.offset_min > 1440 => {
                Some("datetime offset_min outside range [-1440, +1440]")
            }
            Value::Url(u) if u.trim().is_empty() => Some("url must not be empty"),
            _ => None,
        }
    }
}

/// A decoded value of a declared data type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Boolean(bool),
    Datetime(Datetime),
    Decimal(f64),
    Integer(i64),
    Url(String),
}

impl TypedValue {
    /// Returns the data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            TypedValue::String(_) => DataType::String,
            TypedValue::Boolean(_) => DataType::Boolean,
            TypedValue::Datetime(_) => DataType::Datetime,
            TypedValue::Decimal(_) => DataType::Decimal,
            TypedValue::Integer(_) => DataType::Integer,
            TypedValue::Url(_) => DataType::Url,
        }
    }

    /// Converts to a stored value, attaching `locale` to strings.
    pub fn into_value(self, locale: Option<&str>) -> Value {
        match self {
            TypedValue::String(value) => Value::Text {
                value,
                locale: locale.map(str::to_string),
            },
            TypedValue::Boolean(b) => Value::Boolean(b),
            TypedValue::Datetime(dt) => Value::Datetime(dt),
            TypedValue::Decimal(d) => Value::Decimal(d),
            TypedValue::Integer(i) => Value::Integer(i),
            TypedValue::Url(u) => Value::Url(u),
        }
    }
}

/// Compares two locale tags the way language tags compare (ASCII case-insensitive).
pub fn locale_matches(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// A property-value pair held by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    /// The property this value is for.
    pub property: PropertyId,
    /// The value.
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_names() {
        for ty in DataType::ALL {
            assert_eq!(DataType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(DataType::from_name("float"), None);
    }

    #[test]
    fn test_value_validation() {
        assert!(Value::Decimal(f64::NAN).validate().is_some());
        assert!(Value::Decimal(1.5).validate().is_none());
        assert!(Value::Datetime(Datetime::new(0, 1441)).validate().is_some());
        assert!(Value::Datetime(Datetime::new(0, -60)).validate().is_none());
        assert!(Value::Url(" ".to_string()).validate().is_some());
    }

    #[test]
    fn test_value_json_shape() {
        let v = Value::Text { value: "Alice".to_string(), locale: Some("en".to_string()) };
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"text","value":{"value":"Alice","locale":"en"}}"#);

        let dt = Value::Datetime(Datetime::new(1710513000000000, 0));
        let json = serde_json::to_string(&dt).unwrap();
        assert_eq!(json, r#"{"type":"datetime","value":"2024-03-15T14:30:00Z"}"#);
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), dt);
    }

    #[test]
    fn test_locale_matches_ignores_case() {
        assert!(locale_matches("en-GB", "en-gb"));
        assert!(!locale_matches("en", "en-gb"));
    }
}
