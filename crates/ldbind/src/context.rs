//! Shared dataset and node slots.
//!
//! Fields bound to the same dataset share a [`DatasetContext`]; fields bound
//! to the same node share a [`NodeContext`]. Each slot holds its value behind
//! an `Arc` and is only ever replaced wholesale. Subscribers are notified on
//! every replacement through a `tokio::sync::watch` channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::model::{Dataset, Node};
use crate::store::StoreClient;

/// Read/write handle to a shared dataset.
#[derive(Debug, Clone)]
pub struct DatasetContext {
    tx: Arc<watch::Sender<Arc<Dataset>>>,
    loading: Arc<AtomicBool>,
}

impl DatasetContext {
    /// Creates a context holding `dataset`.
    pub fn new(dataset: Dataset) -> Self {
        let (tx, _) = watch::channel(Arc::new(dataset));
        Self {
            tx: Arc::new(tx),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates an empty context whose dataset is still being fetched.
    pub fn pending() -> Self {
        let ctx = Self::new(Dataset::new());
        ctx.loading.store(true, Ordering::SeqCst);
        ctx
    }

    /// The current dataset.
    pub fn dataset(&self) -> Arc<Dataset> {
        self.tx.borrow().clone()
    }

    /// Replaces the dataset and notifies subscribers.
    pub fn set_dataset(&self, dataset: impl Into<Arc<Dataset>>) {
        let dataset = dataset.into();
        debug!(source = dataset.source_url().unwrap_or("<unsaved>"), nodes = dataset.len(), "dataset published");
        self.tx.send_replace(dataset);
    }

    /// Subscribes to dataset replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Dataset>> {
        self.tx.subscribe()
    }

    /// Whether a fetch for this context is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Fetches the dataset at `url` and publishes it.
    ///
    /// The context reports [`is_loading`](Self::is_loading) until the fetch settles.
    pub async fn load(&self, store: &dyn StoreClient, url: &str) -> StoreResult<Arc<Dataset>> {
        self.loading.store(true, Ordering::SeqCst);
        let result = store.fetch_dataset(url).await;
        self.loading.store(false, Ordering::SeqCst);
        match result {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                self.set_dataset(dataset.clone());
                Ok(dataset)
            }
            Err(e) => {
                warn!(url, error = %e, "failed to load dataset");
                Err(e)
            }
        }
    }
}

/// Read/write handle to a shared node.
#[derive(Debug, Clone)]
pub struct NodeContext {
    tx: Arc<watch::Sender<Option<Arc<Node>>>>,
}

impl NodeContext {
    /// Creates a context holding `node`.
    pub fn new(node: Option<Node>) -> Self {
        let (tx, _) = watch::channel(node.map(Arc::new));
        Self { tx: Arc::new(tx) }
    }

    /// Creates a context holding the node at `url` in `dataset`, if present.
    pub fn select(dataset: &Dataset, url: &str) -> Self {
        Self::new(dataset.get_node(url).cloned())
    }

    /// The current node.
    pub fn node(&self) -> Option<Arc<Node>> {
        self.tx.borrow().clone()
    }

    /// Replaces the node and notifies subscribers.
    pub fn set_node(&self, node: impl Into<Arc<Node>>) {
        let node = node.into();
        debug!(node = node.url(), "node published");
        self.tx.send_replace(Some(node));
    }

    /// Subscribes to node replacements.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Node>>> {
        self.tx.subscribe()
    }
}

/// The context slots a field is mounted with.
#[derive(Debug, Clone, Default)]
pub struct Contexts {
    pub dataset: Option<DatasetContext>,
    pub node: Option<NodeContext>,
}

impl Contexts {
    /// No shared contexts.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only a dataset context.
    pub fn with_dataset(dataset: DatasetContext) -> Self {
        Self {
            dataset: Some(dataset),
            node: None,
        }
    }

    /// Adds a node context.
    pub fn and_node(mut self, node: NodeContext) -> Self {
        self.node = Some(node);
        self
    }

    /// Publishes a saved dataset and node to whichever slots are present.
    pub fn publish(&self, dataset: &Arc<Dataset>, node: &Arc<Node>) {
        if let Some(ctx) = &self.dataset {
            ctx.set_dataset(dataset.clone());
        }
        if let Some(ctx) = &self.node {
            ctx.set_node(node.clone());
        }
    }

    /// Whether the dataset slot is still being fetched.
    pub fn is_loading(&self) -> bool {
        self.dataset.as_ref().is_some_and(DatasetContext::is_loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyId;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_subscribers_see_replacement() {
        let ctx = DatasetContext::new(Dataset::new());
        let mut rx = ctx.subscribe();
        let before = ctx.dataset();

        ctx.set_dataset(Dataset::with_source("https://pod.example/doc"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().source_url(), Some("https://pod.example/doc"));
        // The old snapshot is untouched.
        assert_eq!(before.source_url(), None);
    }

    #[tokio::test]
    async fn test_load_sets_and_clears_loading() {
        let store = MemoryStore::new();
        let mut node = Node::new("#a");
        node.set_boolean(PropertyId::from("urn:done"), true);
        store.seed("https://pod.example/todo", &Dataset::new().with_node(node)).await.unwrap();

        let ctx = DatasetContext::pending();
        assert!(ctx.is_loading());
        let ds = ctx.load(&store, "https://pod.example/todo").await.unwrap();
        assert!(!ctx.is_loading());
        assert_eq!(ds.len(), 1);
        assert_eq!(ctx.dataset().source_url(), Some("https://pod.example/todo"));
    }

    #[tokio::test]
    async fn test_failed_load_clears_loading() {
        let store = MemoryStore::new();
        let ctx = DatasetContext::pending();
        assert!(ctx.load(&store, "https://pod.example/missing").await.is_err());
        assert!(!ctx.is_loading());
    }

    #[test]
    fn test_node_select() {
        let ds = Dataset::with_source("https://pod.example/doc").with_node(Node::new("https://pod.example/doc#x"));
        let ctx = NodeContext::select(&ds, "#x");
        assert_eq!(ctx.node().map(|n| n.url().to_string()), Some("https://pod.example/doc#x".into()));
        assert!(NodeContext::select(&ds, "#y").node().is_none());
    }
}
