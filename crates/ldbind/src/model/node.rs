//! Nodes ("things"): identified entities holding typed property values.
//!
//! Getters come in a "first value" and an "all values" flavor. Setters
//! replace every value of the property (for locale-qualified strings, every
//! value in that locale) and `add_*` appends without replacing.

use serde::{Deserialize, Serialize};

use crate::model::id::{anchor_node_url, local_node_name};
use crate::model::value::locale_matches;
use crate::model::{Datetime, PropertyId, PropertyValue, Value};

/// An identified entity with zero or more property values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    url: String,
    #[serde(default)]
    values: Vec<PropertyValue>,
}

impl Node {
    /// Creates an empty node with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            values: Vec::new(),
        }
    }

    /// Creates an empty node with a fresh local name.
    pub fn new_local() -> Self {
        Self::new(local_node_name())
    }

    /// The node's URL (or local name, if not yet anchored).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// All property values in insertion order.
    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    /// Distinct properties that hold at least one value, in first-seen order.
    pub fn properties(&self) -> Vec<&PropertyId> {
        let mut seen: Vec<&PropertyId> = Vec::new();
        for pv in &self.values {
            if !seen.contains(&&pv.property) {
                seen.push(&pv.property);
            }
        }
        seen
    }

    /// Values stored at `property`, in insertion order.
    pub fn values_of<'a>(&'a self, property: &'a PropertyId) -> impl Iterator<Item = &'a Value> + 'a {
        self.values
            .iter()
            .filter(move |pv| &pv.property == property)
            .map(|pv| &pv.value)
    }

    /// Anchors a local name to `dataset_url`.
    pub(crate) fn anchor_to(&mut self, dataset_url: &str) {
        self.url = anchor_node_url(&self.url, dataset_url);
    }

    fn first<'a, T: 'a>(&'a self, property: &'a PropertyId, f: impl Fn(&'a Value) -> Option<T>) -> Option<T> {
        self.values_of(property).find_map(f)
    }

    fn all<'a, T: 'a>(&'a self, property: &'a PropertyId, f: impl Fn(&'a Value) -> Option<T>) -> Vec<T> {
        self.values_of(property).filter_map(f).collect()
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// First locale-free string at `property`.
    pub fn get_string<'a>(&'a self, property: &'a PropertyId) -> Option<&'a str> {
        self.first(property, text_without_locale)
    }

    /// All locale-free strings at `property`.
    pub fn get_string_all<'a>(&'a self, property: &'a PropertyId) -> Vec<&'a str> {
        self.all(property, text_without_locale)
    }

    /// First string at `property` tagged with `locale`.
    pub fn get_string_with_locale<'a>(&'a self, property: &'a PropertyId, locale: &'a str) -> Option<&'a str> {
        self.first(property, move |v| text_in_locale(v, locale))
    }

    /// All strings at `property` tagged with `locale`.
    pub fn get_string_with_locale_all<'a>(&'a self, property: &'a PropertyId, locale: &'a str) -> Vec<&'a str> {
        self.all(property, move |v| text_in_locale(v, locale))
    }

    /// First boolean at `property`.
    pub fn get_boolean(&self, property: &PropertyId) -> Option<bool> {
        self.first(property, as_boolean)
    }

    /// All booleans at `property`.
    pub fn get_boolean_all(&self, property: &PropertyId) -> Vec<bool> {
        self.all(property, as_boolean)
    }

    /// First datetime at `property`.
    pub fn get_datetime(&self, property: &PropertyId) -> Option<Datetime> {
        self.first(property, as_datetime)
    }

    /// All datetimes at `property`.
    pub fn get_datetime_all(&self, property: &PropertyId) -> Vec<Datetime> {
        self.all(property, as_datetime)
    }

    /// First decimal at `property`.
    pub fn get_decimal(&self, property: &PropertyId) -> Option<f64> {
        self.first(property, as_decimal)
    }

    /// All decimals at `property`.
    pub fn get_decimal_all(&self, property: &PropertyId) -> Vec<f64> {
        self.all(property, as_decimal)
    }

    /// First integer at `property`.
    pub fn get_integer(&self, property: &PropertyId) -> Option<i64> {
        self.first(property, as_integer)
    }

    /// All integers at `property`.
    pub fn get_integer_all(&self, property: &PropertyId) -> Vec<i64> {
        self.all(property, as_integer)
    }

    /// First URL at `property`.
    pub fn get_url<'a>(&'a self, property: &'a PropertyId) -> Option<&'a str> {
        self.first(property, as_url)
    }

    /// All URLs at `property`.
    pub fn get_url_all<'a>(&'a self, property: &'a PropertyId) -> Vec<&'a str> {
        self.all(property, as_url)
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Appends a value without touching existing ones.
    pub fn add(&mut self, property: PropertyId, value: Value) -> &mut Self {
        self.values.push(PropertyValue { property, value });
        self
    }

    /// Removes every value at `property`.
    pub fn remove_all(&mut self, property: &PropertyId) -> &mut Self {
        self.values.retain(|pv| &pv.property != property);
        self
    }

    /// Replaces every value at `property` with `value`.
    pub fn set(&mut self, property: PropertyId, value: Value) -> &mut Self {
        self.remove_all(&property);
        self.add(property, value)
    }

    /// Appends a locale-free string.
    pub fn add_string(&mut self, property: PropertyId, value: impl Into<String>) -> &mut Self {
        self.add(property, Value::Text { value: value.into(), locale: None })
    }

    /// Appends a string tagged with `locale`.
    pub fn add_string_with_locale(
        &mut self,
        property: PropertyId,
        value: impl Into<String>,
        locale: impl Into<String>,
    ) -> &mut Self {
        self.add(
            property,
            Value::Text {
                value: value.into(),
                locale: Some(locale.into()),
            },
        )
    }

    /// Replaces every value at `property` with a locale-free string.
    pub fn set_string(&mut self, property: PropertyId, value: impl Into<String>) -> &mut Self {
        self.set(property, Value::Text { value: value.into(), locale: None })
    }

    /// Replaces the strings at `property` in `locale`, keeping other locales and types.
    pub fn set_string_with_locale(
        &mut self,
        property: PropertyId,
        value: impl Into<String>,
        locale: impl Into<String>,
    ) -> &mut Self {
        let locale = locale.into();
        self.remove_string_with_locale(&property, &locale);
        self.add_string_with_locale(property, value, locale)
    }

    /// Removes the strings at `property` tagged with `locale`.
    pub fn remove_string_with_locale(&mut self, property: &PropertyId, locale: &str) -> &mut Self {
        self.values
            .retain(|pv| &pv.property != property || text_in_locale(&pv.value, locale).is_none());
        self
    }

    /// Replaces every value at `property` with a boolean.
    pub fn set_boolean(&mut self, property: PropertyId, value: bool) -> &mut Self {
        self.set(property, Value::Boolean(value))
    }

    /// Replaces every value at `property` with a datetime.
    pub fn set_datetime(&mut self, property: PropertyId, value: Datetime) -> &mut Self {
        self.set(property, Value::Datetime(value))
    }

    /// Replaces every value at `property` with a decimal.
    pub fn set_decimal(&mut self, property: PropertyId, value: f64) -> &mut Self {
        self.set(property, Value::Decimal(value))
    }

    /// Replaces every value at `property` with an integer.
    pub fn set_integer(&mut self, property: PropertyId, value: i64) -> &mut Self {
        self.set(property, Value::Integer(value))
    }

    /// Replaces every value at `property` with a URL.
    pub fn set_url(&mut self, property: PropertyId, value: impl Into<String>) -> &mut Self {
        self.set(property, Value::Url(value.into()))
    }
}

fn text_without_locale(v: &Value) -> Option<&str> {
    match v {
        Value::Text { value, locale: None } => Some(value),
        _ => None,
    }
}

fn text_in_locale<'a>(v: &'a Value, wanted: &str) -> Option<&'a str> {
    match v {
        Value::Text { value, locale: Some(l) } if locale_matches(l, wanted) => Some(value),
        _ => None,
    }
}

fn as_boolean(v: &Value) -> Option<bool> {
    match v {
        Value::Boolean(b) => Some(*b),
        _ => None,
    }
}

fn as_datetime(v: &Value) -> Option<Datetime> {
    match v {
        Value::Datetime(dt) => Some(*dt),
        _ => None,
    }
}

fn as_decimal(v: &Value) -> Option<f64> {
    match v {
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => Some(*i),
        _ => None,
    }
}

fn as_url(v: &Value) -> Option<&str> {
    match v {
        Value::Url(u) => Some(u),
        _ => None,
    }
}
