//! Property resolution: which property a field binds to, and its value.
//!
//! With a single candidate the choice is unconditional. With several, each
//! is probed in order and the first one holding a value of the declared type
//! wins; if none does, the first candidate is chosen so the field can still
//! be edited.

use tracing::debug;

use crate::codec::{decode_value, decode_values};
use crate::error::ResolveError;
use crate::model::{DataType, Node, PropertyId, TypedValue};

/// Outcome of resolving a field against a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// The property the field reads and writes.
    pub chosen: PropertyId,
    /// The decoded value, if the chosen property holds one.
    pub value: Option<TypedValue>,
}

/// Resolves the property and value for a field.
///
/// `node_url` is only used to name the missing node in the error.
pub fn resolve(
    node: Option<&Node>,
    node_url: Option<&str>,
    candidates: &[PropertyId],
    data_type: DataType,
    locale: Option<&str>,
) -> Result<Resolved, ResolveError> {
    let node = node.ok_or_else(|| ResolveError::NodeNotFound {
        url: node_url.unwrap_or_default().to_string(),
    })?;
    let (first, rest) = candidates.split_first().ok_or(ResolveError::NoProperty)?;
    let locale = locale.filter(|_| data_type == DataType::String);

    if rest.is_empty() {
        return Ok(Resolved {
            chosen: first.clone(),
            value: decode_value(node, first, data_type, locale),
        });
    }

    for candidate in candidates {
        if let Some(value) = decode_value(node, candidate, data_type, locale) {
            debug!(node = node.url(), property = %candidate, "resolved candidate property");
            return Ok(Resolved {
                chosen: candidate.clone(),
                value: Some(value),
            });
        }
    }

    debug!(node = node.url(), property = %first, "no candidate holds a value, using first");
    Ok(Resolved {
        chosen: first.clone(),
        value: None,
    })
}

/// Decodes every value at an already chosen property.
pub fn resolve_all(node: &Node, property: &PropertyId, data_type: DataType, locale: Option<&str>) -> Vec<TypedValue> {
    decode_values(node, property, data_type, locale.filter(|_| data_type == DataType::String))
}

/// Re-reads the value at an already chosen property.
///
/// Used after the session has fixed its property, so newly appearing values
/// at other candidates do not move the binding.
pub fn reread(node: &Node, property: &PropertyId, data_type: DataType, locale: Option<&str>) -> Option<TypedValue> {
    decode_value(node, property, data_type, locale.filter(|_| data_type == DataType::String))
}
