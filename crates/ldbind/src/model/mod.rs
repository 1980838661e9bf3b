//! Data model types.
//!
//! This module contains the linked-data types fields bind to:
//! - Identifiers (property IRIs, node URLs)
//! - Values (stored and decoded)
//! - Nodes (entities holding property values)
//! - Datasets (collections of nodes)

pub mod dataset;
pub mod id;
pub mod node;
pub mod value;

pub use dataset::Dataset;
pub use id::{anchor_node_url, is_local_name, local_node_name, PropertyId};
pub use node::Node;
pub use value::{locale_matches, DataType, Datetime, PropertyValue, TypedValue, Value};
