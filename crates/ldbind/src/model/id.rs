//! Identifiers for nodes and properties.
//!
//! Properties are named by URI-like strings. Nodes are named by URLs; a node
//! created locally before its dataset has been saved gets a fragment-only
//! name (`#<uuid>`) that is anchored to the dataset URL once one is known.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A URI-like identifier naming a predicate on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(String);

impl PropertyId {
    /// Creates a property identifier.
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PropertyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PropertyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Prefix of node names that are not yet anchored to a dataset URL.
pub const LOCAL_NODE_PREFIX: char = '#';

/// Generates a fresh local node name (`#` followed by a random UUID).
pub fn local_node_name() -> String {
    format!("{}{}", LOCAL_NODE_PREFIX, Uuid::new_v4().simple())
}

/// Returns true if `url` is a local (fragment-only) node name.
pub fn is_local_name(url: &str) -> bool {
    url.starts_with(LOCAL_NODE_PREFIX)
}

/// Anchors a node URL to a dataset URL.
///
/// Local names become `<dataset_url>#<name>`, with any fragment already on
/// the dataset URL dropped. Absolute URLs are returned unchanged.
pub fn anchor_node_url(node_url: &str, dataset_url: &str) -> String {
    if !is_local_name(node_url) {
        return node_url.to_string();
    }
    let base = match dataset_url.find('#') {
        Some(pos) => &dataset_url[..pos],
        None => dataset_url,
    };
    format!("{}{}", base, node_url)
}
