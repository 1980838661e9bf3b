//! Error types for resolution, encoding, persistence and field handling.

use thiserror::Error;

use crate::model::{DataType, PropertyId};

/// Error during property resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("node not found: {url}")]
    NodeNotFound { url: String },

    #[error("no property configured for field")]
    NoProperty,
}

/// Error while writing a value into a node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("value of type {actual} cannot be written to a {expected} field")]
    TypeMismatch { expected: DataType, actual: DataType },

    #[error("invalid value for property {property}: {reason}")]
    InvalidValue {
        property: PropertyId,
        reason: &'static str,
    },
}

/// Result type for store client operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store client.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset not found at {0}")]
    NotFound(String),

    #[error("store rejected request for {url}: {reason}")]
    Rejected { url: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Error while committing an edit.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("dataset has no source location and no target location was supplied")]
    MissingTargetLocation,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// Error surfaced by a field to its caller or error callback.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Save(#[from] SaveError),
}

impl FieldError {
    /// Returns true if this is a missing-node resolution error.
    pub fn is_node_not_found(&self) -> bool {
        matches!(self, FieldError::Resolve(ResolveError::NodeNotFound { .. }))
    }

    /// Returns true if this is a missing-target-location save error.
    pub fn is_missing_target_location(&self) -> bool {
        matches!(self, FieldError::Save(SaveError::MissingTargetLocation))
    }

    /// Returns true if the store client rejected the save or the re-fetch.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, FieldError::Save(SaveError::Persistence(_)))
    }
}
