//! ldbind: typed property binding for linked-data datasets.
//!
//! This crate binds editable fields to typed property values held on nodes of
//! a remote linked-data dataset. It resolves which property a field reads,
//! tracks the field's in-progress edit, and persists committed edits through
//! a store client, re-fetching the canonical copy and republishing it to
//! every consumer sharing the dataset.
//!
//! # Overview
//!
//! A field is headless: a host UI (or a test) drives it with input and
//! commit events.
//! - **Resolve**: pick the property from one or several candidates, decoding
//!   the value with the field's declared [`DataType`]
//! - **Edit**: hold the last committed and the currently typed value
//! - **Save**: encode, merge, persist, re-fetch, publish
//!
//! # Quick Start
//!
//! ```rust
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! use std::sync::Arc;
//! use ldbind::{
//!     Callbacks, Contexts, DataType, Dataset, DatasetContext, Field, FieldConfig, MemoryStore, Node,
//!     PropertyId, StoreClient,
//! };
//!
//! let name = PropertyId::from("http://schema.org/name");
//! let mut me = Node::new("https://pod.example/card#me");
//! me.set_string(name.clone(), "Alice");
//!
//! let store = Arc::new(MemoryStore::new());
//! store.seed("https://pod.example/card", &Dataset::new().with_node(me)).await.unwrap();
//!
//! // Fetch the dataset into a shared context.
//! let ctx = DatasetContext::pending();
//! ctx.load(store.as_ref(), "https://pod.example/card").await.unwrap();
//!
//! let config = FieldConfig::new(DataType::String)
//!     .node_url("https://pod.example/card#me")
//!     .property(name.clone())
//!     .edit(true)
//!     .autosave(true);
//! let field = Field::mount(config, Contexts::with_dataset(ctx.clone()), Callbacks::none(), store.clone()).unwrap();
//!
//! field.input("Bob");
//! field.commit().await.unwrap();
//!
//! let stored = store.fetch_dataset("https://pod.example/card").await.unwrap();
//! assert_eq!(stored.get_node("https://pod.example/card#me").unwrap().get_string(&name), Some("Bob"));
//! assert_eq!(ctx.dataset().as_ref(), &stored);
//! # });
//! ```
//!
//! # Modules
//!
//! - [`model`]: Nodes, datasets, property ids and values
//! - [`codec`]: Per-type value decoding/encoding and field text conversion
//! - [`validate`]: Input constraint validation
//! - [`resolve`]: Property resolution
//! - [`session`]: Edit sessions
//! - [`save`]: The commit pipeline
//! - [`field`]: The field controller
//! - [`store`]: Store client trait and in-memory store
//! - [`context`]: Shared dataset and node slots
//! - [`config`]: Field configuration
//! - [`error`]: Error types
//!
//! # Logging
//!
//! The crate logs through `tracing`. Install a subscriber to see resolution,
//! commit and publication events.

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod model;
pub mod resolve;
pub mod save;
pub mod session;
pub mod store;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{FieldText, FieldTextError};
pub use config::{FieldConfig, HostCapabilities};
pub use context::{Contexts, DatasetContext, NodeContext};
pub use error::{EncodeError, FieldError, ResolveError, SaveError, StoreError, StoreResult};
pub use field::{CommitOutcome, Field, FieldStatus};
pub use model::{DataType, Dataset, Datetime, Node, PropertyId, PropertyValue, TypedValue, Value};
pub use resolve::{resolve, Resolved};
pub use save::{Callbacks, CommitResult, SaveCoordinator, SaveOutcome, SaveRequest};
pub use session::{CommitDecision, EditSession, SessionState, SkipReason};
pub use store::{MemoryStore, StoreClient};
pub use validate::validate_input;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
