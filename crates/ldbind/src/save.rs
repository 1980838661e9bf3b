//! The commit pipeline: encode, merge, persist, re-fetch, publish.
//!
//! # Example
//!
//! ```rust
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! use std::sync::Arc;
//! use ldbind::{DataType, Dataset, MemoryStore, Node, PropertyId, SaveCoordinator, SaveRequest, TypedValue};
//!
//! let store = Arc::new(MemoryStore::new());
//! let coordinator = SaveCoordinator::new(store.clone());
//!
//! let name = PropertyId::from("http://schema.org/name");
//! let node = Node::new("#me");
//! let dataset = Dataset::new().with_node(node.clone());
//!
//! let outcome = coordinator
//!     .save(SaveRequest {
//!         node: &node,
//!         property: &name,
//!         data_type: DataType::String,
//!         value: Some(TypedValue::String("Alice".into())),
//!         dataset: &dataset,
//!         target: Some("https://pod.example/card"),
//!         locale: None,
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(outcome.node.get_string(&name), Some("Alice"));
//! assert_eq!(store.save_count(), 1);
//! # });
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::encode_value;
use crate::context::Contexts;
use crate::error::{FieldError, SaveError};
use crate::model::{DataType, Dataset, Node, PropertyId, TypedValue};
use crate::store::StoreClient;

/// Callback invoked with the saved dataset and node.
pub type SaveCallback = Arc<dyn Fn(&Dataset, &Node) + Send + Sync>;

/// Callback invoked with a field error.
pub type ErrorCallback = Arc<dyn Fn(&FieldError) + Send + Sync>;

/// Caller-supplied callbacks for a field.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_save: Option<SaveCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl Callbacks {
    /// No callbacks.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the success callback.
    pub fn on_save(mut self, f: impl Fn(&Dataset, &Node) + Send + Sync + 'static) -> Self {
        self.on_save = Some(Arc::new(f));
        self
    }

    /// Sets the error callback.
    pub fn on_error(mut self, f: impl Fn(&FieldError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Whether structured error handling is configured.
    pub fn handles_errors(&self) -> bool {
        self.on_error.is_some()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_save", &self.on_save.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Generation counter tying async completions to a live field.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<AtomicU64>);

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a token for the current generation.
    pub fn token(&self) -> LivenessToken {
        LivenessToken {
            generation: self.0.load(Ordering::SeqCst),
            counter: self.0.clone(),
        }
    }

    /// Invalidates every outstanding token.
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A snapshot of a [`Liveness`] generation.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl LivenessToken {
    /// Whether the owning field has not been invalidated since this token was taken.
    pub fn is_live(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.generation
    }
}

/// Everything needed to persist one edited value.
#[derive(Debug, Clone)]
pub struct SaveRequest<'a> {
    pub node: &'a Node,
    pub property: &'a PropertyId,
    pub data_type: DataType,
    /// Value to write; `None` clears the property.
    pub value: Option<TypedValue>,
    pub dataset: &'a Dataset,
    /// Explicit save location, overriding the dataset's source URL.
    pub target: Option<&'a str>,
    pub locale: Option<&'a str>,
}

/// The canonical dataset and node after a successful save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub dataset: Arc<Dataset>,
    pub node: Arc<Node>,
}

/// Result of a full commit.
#[derive(Debug, Clone)]
pub enum CommitResult {
    /// Saved and published.
    Saved(SaveOutcome),
    /// The commit failed; the error went to the error callback or the log.
    Failed,
}

/// Persists edits through a store client and reconciles the canonical copy.
#[derive(Clone)]
pub struct SaveCoordinator {
    store: Arc<dyn StoreClient>,
}

impl fmt::Debug for SaveCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveCoordinator").finish_non_exhaustive()
    }
}

impl SaveCoordinator {
    /// Creates a coordinator over `store`.
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self { store }
    }

    /// The store client this coordinator writes to.
    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    /// Encodes, merges, persists and re-fetches.
    ///
    /// The re-fetched dataset is authoritative. The returned node is the
    /// re-fetched copy, or the locally encoded node if the store dropped it.
    pub async fn save(&self, req: SaveRequest<'_>) -> Result<SaveOutcome, SaveError> {
        let mut node = req.node.clone();
        encode_value(&mut node, req.property, req.data_type, req.value, req.locale)?;

        let merged = req.dataset.with_node(node.clone());

        let target = req
            .target
            .or(merged.source_url())
            .ok_or(SaveError::MissingTargetLocation)?
            .to_string();

        debug!(target = %target, node = node.url(), property = %req.property, "saving dataset");
        self.store.save_dataset_at(&target, &merged).await?;
        let fetched = self.store.fetch_dataset(&target).await?;

        let saved_node = fetched.get_node(node.url()).cloned().unwrap_or(node);
        info!(target = %target, node = saved_node.url(), "dataset saved");

        Ok(SaveOutcome {
            dataset: Arc::new(fetched),
            node: Arc::new(saved_node),
        })
    }

    /// Runs [`save`](Self::save), publishes the result and invokes callbacks.
    ///
    /// Errors are routed to `on_error`. The only error returned is a missing
    /// target location when no `on_error` is configured. Publication always
    /// happens on success; callbacks only while `token` is live.
    pub async fn commit(
        &self,
        req: SaveRequest<'_>,
        contexts: &Contexts,
        callbacks: &Callbacks,
        token: &LivenessToken,
    ) -> Result<CommitResult, FieldError> {
        match self.save(req).await {
            Ok(outcome) => {
                contexts.publish(&outcome.dataset, &outcome.node);
                if token.is_live() {
                    if let Some(on_save) = &callbacks.on_save {
                        on_save(&outcome.dataset, &outcome.node);
                    }
                } else {
                    debug!(node = outcome.node.url(), "field unmounted before save completed");
                }
                Ok(CommitResult::Saved(outcome))
            }
            Err(SaveError::MissingTargetLocation) if !callbacks.handles_errors() => {
                Err(FieldError::Save(SaveError::MissingTargetLocation))
            }
            Err(e) => {
                let err = FieldError::Save(e);
                match (&callbacks.on_error, token.is_live()) {
                    (Some(on_error), true) => on_error(&err),
                    _ => warn!(error = %err, "save failed"),
                }
                Ok(CommitResult::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::context::DatasetContext;
    use crate::error::{StoreError, StoreResult};
    use crate::store::MemoryStore;

    const DOC: &str = "https://pod.example/profile";

    fn name() -> PropertyId {
        PropertyId::from("http://schema.org/name")
    }

    fn alice() -> (Node, Dataset) {
        let mut node = Node::new(format!("{}#me", DOC));
        node.set_string(name(), "Alice");
        let ds = Dataset::with_source(DOC).with_node(node.clone());
        (node, ds)
    }

    fn request<'a>(node: &'a Node, ds: &'a Dataset, prop: &'a PropertyId, value: &str) -> SaveRequest<'a> {
        SaveRequest {
            node,
            property: prop,
            data_type: DataType::String,
            value: Some(TypedValue::String(value.to_string())),
            dataset: ds,
            target: None,
            locale: None,
        }
    }

    struct RejectingStore;

    #[async_trait]
    impl StoreClient for RejectingStore {
        async fn fetch_dataset(&self, url: &str) -> StoreResult<Dataset> {
            Err(StoreError::NotFound(url.to_string()))
        }

        async fn save_dataset_at(&self, url: &str, _dataset: &Dataset) -> StoreResult<Dataset> {
            Err(StoreError::Rejected {
                url: url.to_string(),
                reason: "403 Forbidden".to_string(),
            })
        }
    }

    /// Normalizes strings on save, to check the re-fetched copy wins.
    struct UppercasingStore(MemoryStore);

    #[async_trait]
    impl StoreClient for UppercasingStore {
        async fn fetch_dataset(&self, url: &str) -> StoreResult<Dataset> {
            self.0.fetch_dataset(url).await
        }

        async fn save_dataset_at(&self, url: &str, dataset: &Dataset) -> StoreResult<Dataset> {
            let mut normalized = Dataset::with_source(url);
            for node in dataset.nodes() {
                let mut node = node.clone();
                if let Some(s) = node.get_string(&name()).map(str::to_uppercase) {
                    node.set_string(name(), s);
                }
                normalized.set_node(node);
            }
            self.0.save_dataset_at(url, &normalized).await
        }
    }

    #[tokio::test]
    async fn test_save_uses_source_url() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = SaveCoordinator::new(store.clone());
        let (node, ds) = alice();
        let prop = name();

        let outcome = coordinator.save(request(&node, &ds, &prop, "Bob")).await.unwrap();
        assert_eq!(outcome.node.get_string(&prop), Some("Bob"));
        assert_eq!(outcome.dataset.source_url(), Some(DOC));
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.fetch_count(), 1);
        // Input dataset is untouched.
        assert_eq!(ds.get_node(node.url()).unwrap().get_string(&prop), Some("Alice"));
    }

    #[tokio::test]
    async fn test_explicit_target_wins() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = SaveCoordinator::new(store.clone());
        let (node, ds) = alice();
        let prop = name();
        let mut req = request(&node, &ds, &prop, "Bob");
        req.target = Some("https://pod.example/copy");

        let outcome = coordinator.save(req).await.unwrap();
        assert_eq!(outcome.dataset.source_url(), Some("https://pod.example/copy"));
        assert!(store.fetch_dataset(DOC).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_target_never_calls_store() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = SaveCoordinator::new(store.clone());
        let node = Node::new("#me");
        let ds = Dataset::new().with_node(node.clone());
        let prop = name();

        let err = coordinator.save(request(&node, &ds, &prop, "Bob")).await.unwrap_err();
        assert!(matches!(err, SaveError::MissingTargetLocation));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_non_finite_decimal_never_reaches_store() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = SaveCoordinator::new(store.clone());
        let amount = PropertyId::from("http://schema.org/price");
        let node = Node::new("#item");
        let ds = Dataset::new();

        let err = coordinator
            .save(SaveRequest {
                node: &node,
                property: &amount,
                data_type: DataType::Decimal,
                value: Some(TypedValue::Decimal(f64::INFINITY)),
                dataset: &ds,
                target: Some("https://pod.example/d"),
                locale: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::Encode(_)));
        assert_eq!(store.save_count(), 0);
        assert!(matches!(
            store.fetch_dataset("https://pod.example/d").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_refetched_copy_is_authoritative() {
        let coordinator = SaveCoordinator::new(Arc::new(UppercasingStore(MemoryStore::new())));
        let (node, ds) = alice();
        let prop = name();
        let outcome = coordinator.save(request(&node, &ds, &prop, "Bob")).await.unwrap();
        assert_eq!(outcome.node.get_string(&prop), Some("BOB"));
    }

    #[tokio::test]
    async fn test_commit_publishes_and_calls_on_save() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = SaveCoordinator::new(store);
        let (node, ds) = alice();
        let prop = name();
        let ctx = DatasetContext::new(ds.clone());
        let contexts = Contexts::with_dataset(ctx.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let callbacks = Callbacks::none().on_save(move |_, node| {
            seen2.lock().unwrap().push(node.get_string(&name()).map(str::to_string));
        });

        let result = coordinator
            .commit(request(&node, &ds, &prop, "Bob"), &contexts, &callbacks, &Liveness::new().token())
            .await
            .unwrap();
        assert!(matches!(result, CommitResult::Saved(_)));
        assert_eq!(*seen.lock().unwrap(), vec![Some("Bob".to_string())]);
        let published = ctx.dataset();
        assert_eq!(published.get_node(node.url()).unwrap().get_string(&prop), Some("Bob"));
    }

    #[tokio::test]
    async fn test_commit_routes_store_rejection() {
        let coordinator = SaveCoordinator::new(Arc::new(RejectingStore));
        let (node, ds) = alice();
        let prop = name();

        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors2 = errors.clone();
        let callbacks = Callbacks::none().on_error(move |e| errors2.lock().unwrap().push(e.to_string()));

        let result = coordinator
            .commit(request(&node, &ds, &prop, "Bob"), &Contexts::none(), &callbacks, &Liveness::new().token())
            .await
            .unwrap();
        assert!(matches!(result, CommitResult::Failed));
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("403 Forbidden"));
    }

    #[tokio::test]
    async fn test_commit_without_handler_swallows_persistence_failure() {
        let coordinator = SaveCoordinator::new(Arc::new(RejectingStore));
        let (node, ds) = alice();
        let prop = name();
        let result = coordinator
            .commit(request(&node, &ds, &prop, "Bob"), &Contexts::none(), &Callbacks::none(), &Liveness::new().token())
            .await;
        assert!(matches!(result, Ok(CommitResult::Failed)));
    }

    #[tokio::test]
    async fn test_commit_without_handler_returns_missing_target() {
        let coordinator = SaveCoordinator::new(Arc::new(MemoryStore::new()));
        let node = Node::new("#me");
        let ds = Dataset::new();
        let prop = name();
        let result = coordinator
            .commit(request(&node, &ds, &prop, "Bob"), &Contexts::none(), &Callbacks::none(), &Liveness::new().token())
            .await;
        assert!(matches!(result, Err(e) if e.is_missing_target_location()));
    }

    #[tokio::test]
    async fn test_stale_token_skips_callbacks() {
        let coordinator = SaveCoordinator::new(Arc::new(MemoryStore::new()));
        let (node, ds) = alice();
        let prop = name();
        let liveness = Liveness::new();
        let token = liveness.token();
        liveness.invalidate();

        let called = Arc::new(Mutex::new(false));
        let called2 = called.clone();
        let callbacks = Callbacks::none().on_save(move |_, _| *called2.lock().unwrap() = true);
        let result = coordinator
            .commit(request(&node, &ds, &prop, "Bob"), &Contexts::none(), &callbacks, &token)
            .await
            .unwrap();
        assert!(matches!(result, CommitResult::Saved(_)));
        assert!(!*called.lock().unwrap());
    }
}
