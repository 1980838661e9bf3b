//! Per-field configuration.
//!
//! # Example
//!
//! ```rust
//! use ldbind::{DataType, FieldConfig};
//!
//! let config = FieldConfig::new(DataType::String)
//!     .node_url("https://pod.example/profile/card#me")
//!     .property("http://xmlns.com/foaf/0.1/name")
//!     .locale("en")
//!     .edit(true)
//!     .autosave(true);
//!
//! assert_eq!(config.candidates().len(), 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::model::{DataType, Dataset, Node, PropertyId};

/// Input capabilities of the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Whether the host offers a combined date+time input. When false,
    /// datetime fields are edited as separate date and time parts.
    pub datetime_local: bool,
    /// UTC offset of the host's local time, in minutes.
    pub utc_offset_min: i16,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            datetime_local: true,
            utc_offset_min: 0,
        }
    }
}

/// Configuration of a single bound field.
///
/// The node and dataset fall back to the node/dataset contexts the field is
/// mounted with when not given here.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    /// Node to bind to, overriding the node context.
    pub node: Option<Node>,
    /// URL of the node to look up in the dataset, when no node is given.
    pub node_url: Option<String>,
    /// Dataset owning the node, overriding the dataset context.
    pub dataset: Option<Dataset>,
    /// Single property to bind to. Takes precedence over `properties`.
    pub property: Option<PropertyId>,
    /// Candidate properties, first match wins.
    pub properties: Vec<PropertyId>,
    /// Declared data type.
    pub data_type: DataType,
    /// Locale for string values.
    pub locale: Option<String>,
    /// Whether the field renders in write mode.
    pub edit: bool,
    /// Whether a commit persists the edit. When false, edits stay local.
    pub autosave: bool,
    /// Explicit location to save the dataset to.
    pub save_dataset_to: Option<String>,
    /// Host input capabilities.
    pub host: HostCapabilities,
}

impl FieldConfig {
    /// Creates a read-only configuration for `data_type` with no property set.
    pub fn new(data_type: DataType) -> Self {
        Self {
            node: None,
            node_url: None,
            dataset: None,
            property: None,
            properties: Vec::new(),
            data_type,
            locale: None,
            edit: false,
            autosave: false,
            save_dataset_to: None,
            host: HostCapabilities::default(),
        }
    }

    /// Binds to an explicit node.
    pub fn node(mut self, node: Node) -> Self {
        self.node = Some(node);
        self
    }

    /// Binds to the node at `url` in the field's dataset.
    pub fn node_url(mut self, url: impl Into<String>) -> Self {
        self.node_url = Some(url.into());
        self
    }

    /// Uses an explicit dataset.
    pub fn dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Sets the single property.
    pub fn property(mut self, property: impl Into<PropertyId>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Sets the candidate properties.
    pub fn properties<I, P>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyId>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the locale for string values.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Enables or disables write mode.
    pub fn edit(mut self, edit: bool) -> Self {
        self.edit = edit;
        self
    }

    /// Enables or disables persisting on commit.
    pub fn autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Sets the explicit save location.
    pub fn save_dataset_to(mut self, url: impl Into<String>) -> Self {
        self.save_dataset_to = Some(url.into());
        self
    }

    /// Sets the host input capabilities.
    pub fn host(mut self, host: HostCapabilities) -> Self {
        self.host = host;
        self
    }

    /// The candidate list handed to the resolver.
    pub fn candidates(&self) -> Vec<PropertyId> {
        match &self.property {
            Some(p) => vec![p.clone()],
            None => self.properties.clone(),
        }
    }

    /// The locale that applies to this field's type, if any.
    pub fn effective_locale(&self) -> Option<&str> {
        match self.data_type {
            DataType::String => self.locale.as_deref(),
            _ => None,
        }
    }
}
