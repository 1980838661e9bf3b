//! Typed reads and writes of property values on nodes.
//!
//! One dispatch point per direction: [`decode_value`], [`decode_values`] and
//! [`encode_value`] select the getter/setter pair for a [`DataType`].

use crate::error::EncodeError;
use crate::model::{DataType, Node, PropertyId, TypedValue, Value};

// =============================================================================
// DECODING
// =============================================================================

/// Decodes the first value of `data_type` stored at `property`.
///
/// For strings, a `locale` selects the locale-qualified value; without one
/// only locale-free strings are read.
pub fn decode_value(
    node: &Node,
    property: &PropertyId,
    data_type: DataType,
    locale: Option<&str>,
) -> Option<TypedValue> {
    match data_type {
        DataType::String => decode_string(node, property, locale),
        DataType::Boolean => node.get_boolean(property).map(TypedValue::Boolean),
        DataType::Datetime => node.get_datetime(property).map(TypedValue::Datetime),
        DataType::Decimal => node.get_decimal(property).map(TypedValue::Decimal),
        DataType::Integer => node.get_integer(property).map(TypedValue::Integer),
        DataType::Url => node.get_url(property).map(|u| TypedValue::Url(u.to_string())),
    }
}

fn decode_string(node: &Node, property: &PropertyId, locale: Option<&str>) -> Option<TypedValue> {
    let s = match locale {
        Some(locale) => node.get_string_with_locale(property, locale),
        None => node.get_string(property),
    };
    s.map(|s| TypedValue::String(s.to_string()))
}

/// Decodes every value of `data_type` stored at `property`.
pub fn decode_values(
    node: &Node,
    property: &PropertyId,
    data_type: DataType,
    locale: Option<&str>,
) -> Vec<TypedValue> {
    match data_type {
        DataType::String => {
            let all = match locale {
                Some(locale) => node.get_string_with_locale_all(property, locale),
                None => node.get_string_all(property),
            };
            all.into_iter().map(|s| TypedValue::String(s.to_string())).collect()
        }
        DataType::Boolean => node.get_boolean_all(property).into_iter().map(TypedValue::Boolean).collect(),
        DataType::Datetime => node.get_datetime_all(property).into_iter().map(TypedValue::Datetime).collect(),
        DataType::Decimal => node.get_decimal_all(property).into_iter().map(TypedValue::Decimal).collect(),
        DataType::Integer => node.get_integer_all(property).into_iter().map(TypedValue::Integer).collect(),
        DataType::Url => node
            .get_url_all(property)
            .into_iter()
            .map(|u| TypedValue::Url(u.to_string()))
            .collect(),
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writes `value` to `property`, replacing what the matching getter would read.
///
/// `None` clears the slot instead. Strings with a `locale` only replace the
/// values in that locale.
pub fn encode_value(
    node: &mut Node,
    property: &PropertyId,
    data_type: DataType,
    value: Option<TypedValue>,
    locale: Option<&str>,
) -> Result<(), EncodeError> {
    let Some(value) = value else {
        clear_value(node, property, data_type, locale);
        return Ok(());
    };

    if value.data_type() != data_type {
        return Err(EncodeError::TypeMismatch {
            expected: data_type,
            actual: value.data_type(),
        });
    }

    let stored = value.into_value(locale.filter(|_| data_type == DataType::String));
    if let Some(reason) = stored.validate() {
        return Err(EncodeError::InvalidValue {
            property: property.clone(),
            reason,
        });
    }

    match stored {
        Value::Text { value, locale: Some(locale) } => {
            node.set_string_with_locale(property.clone(), value, locale);
        }
        other => {
            node.set(property.clone(), other);
        }
    }
    Ok(())
}

fn clear_value(node: &mut Node, property: &PropertyId, data_type: DataType, locale: Option<&str>) {
    match (data_type, locale) {
        (DataType::String, Some(locale)) => node.remove_string_with_locale(property, locale),
        _ => node.remove_all(property),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Datetime;
    use proptest::prelude::*;

    fn prop() -> PropertyId {
        PropertyId::from("http://example.org/p")
    }

    fn typed_value() -> impl Strategy<Value = TypedValue> {
        prop_oneof![
            ".*".prop_map(TypedValue::String),
            any::<bool>().prop_map(TypedValue::Boolean),
            (-(1i64 << 50)..(1i64 << 50), -1440i16..=1440)
                .prop_map(|(us, off)| TypedValue::Datetime(Datetime::new(us, off))),
            any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(TypedValue::Decimal),
            any::<i64>().prop_map(TypedValue::Integer),
            "https://[a-z]{1,12}\\.example/[a-z0-9]{0,8}".prop_map(TypedValue::Url),
        ]
    }

    proptest! {
        #[test]
        fn encode_then_decode_returns_value(value in typed_value(), locale in proptest::option::of("[a-z]{2}")) {
            let ty = value.data_type();
            let mut node = Node::new("#n");
            encode_value(&mut node, &prop(), ty, Some(value.clone()), locale.as_deref()).unwrap();
            let locale = locale.filter(|_| ty == DataType::String);
            prop_assert_eq!(decode_value(&node, &prop(), ty, locale.as_deref()), Some(value));
        }
    }

    #[test]
    fn test_decode_respects_locale() {
        let mut node = Node::new("#n");
        node.add_string(prop(), "plain").add_string_with_locale(prop(), "hallo", "de");
        assert_eq!(
            decode_value(&node, &prop(), DataType::String, None),
            Some(TypedValue::String("plain".to_string()))
        );
        assert_eq!(
            decode_value(&node, &prop(), DataType::String, Some("de")),
            Some(TypedValue::String("hallo".to_string()))
        );
        assert_eq!(decode_value(&node, &prop(), DataType::String, Some("fr")), None);
    }

    #[test]
    fn test_decode_values_all() {
        let mut node = Node::new("#n");
        node.add(prop(), Value::Integer(1))
            .add(prop(), Value::Decimal(2.5))
            .add(prop(), Value::Integer(3));
        assert_eq!(
            decode_values(&node, &prop(), DataType::Integer, None),
            vec![TypedValue::Integer(1), TypedValue::Integer(3)]
        );
    }

    #[test]
    fn test_encode_rejects_type_mismatch() {
        let mut node = Node::new("#n");
        let err = encode_value(&mut node, &prop(), DataType::Integer, Some(TypedValue::Boolean(true)), None)
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::TypeMismatch { expected: DataType::Integer, actual: DataType::Boolean }
        );
        assert!(node.values().is_empty());
    }

    #[test]
    fn test_encode_rejects_nan() {
        let mut node = Node::new("#n");
        let err = encode_value(&mut node, &prop(), DataType::Decimal, Some(TypedValue::Decimal(f64::NAN)), None);
        assert!(matches!(err, Err(EncodeError::InvalidValue { .. })));
    }

    #[test]
    fn test_encode_rejects_infinite_decimal() {
        let mut node = Node::new("#n");
        for v in [f64::INFINITY, f64::NEG_INFINITY] {
            let err = encode_value(&mut node, &prop(), DataType::Decimal, Some(TypedValue::Decimal(v)), None);
            assert!(matches!(err, Err(EncodeError::InvalidValue { reason: "decimal must be finite", .. })));
        }
        assert!(node.values().is_empty());
    }

    #[test]
    fn test_clear_locale_slot_only() {
        let mut node = Node::new("#n");
        node.add_string(prop(), "plain")
            .add_string_with_locale(prop(), "hello", "en")
            .add_string_with_locale(prop(), "hola", "es");
        encode_value(&mut node, &prop(), DataType::String, None, Some("en")).unwrap();
        assert_eq!(node.get_string_with_locale(&prop(), "en"), None);
        assert_eq!(node.get_string_with_locale(&prop(), "es"), Some("hola"));
        assert_eq!(node.get_string(&prop()), Some("plain"));
    }

    #[test]
    fn test_clear_removes_all_values() {
        let mut node = Node::new("#n");
        node.set_integer(prop(), 4);
        encode_value(&mut node, &prop(), DataType::Integer, None, None).unwrap();
        assert!(node.values().is_empty());
    }
}
