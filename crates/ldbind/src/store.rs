//! Store client abstraction.
//!
//! The store is the remote side of a dataset: it saves a dataset at a
//! location and serves the canonical copy back.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::model::Dataset;

/// Abstract linked-data store interface.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetches the dataset stored at `url`.
    async fn fetch_dataset(&self, url: &str) -> StoreResult<Dataset>;

    /// Saves `dataset` at `url`, returning the dataset as stored.
    async fn save_dataset_at(&self, url: &str, dataset: &Dataset) -> StoreResult<Dataset>;
}

/// An in-memory store keeping each dataset as its JSON document.
///
/// Saving goes through a full serialize/deserialize round trip and anchors
/// local node names to the save location, the way a server assigns absolute
/// URLs on write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<FxHashMap<String, String>>,
    saves: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `dataset` at `url` without counting it as a save.
    pub async fn seed(&self, url: &str, dataset: &Dataset) -> StoreResult<()> {
        let stored = dataset.clone().persisted_at(url);
        let json = serde_json::to_string(&stored)?;
        self.documents.write().await.insert(url.to_string(), json);
        Ok(())
    }

    /// Number of `save_dataset_at` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of `fetch_dataset` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn fetch_dataset(&self, url: &str) -> StoreResult<Dataset> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.read().await;
        let json = documents
            .get(url)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
        Ok(serde_json::from_str(json)?)
    }

    async fn save_dataset_at(&self, url: &str, dataset: &Dataset) -> StoreResult<Dataset> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let stored = dataset.clone().persisted_at(url);
        let json = serde_json::to_string(&stored)?;
        debug!(url, bytes = json.len(), nodes = stored.len(), "stored dataset");
        self.documents.write().await.insert(url.to_string(), json);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, PropertyId};

    #[tokio::test]
    async fn test_fetch_missing_dataset() {
        let store = MemoryStore::new();
        let err = store.fetch_dataset("https://pod.example/none").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_save_then_fetch() {
        let store = MemoryStore::new();
        let mut node = Node::new("#me");
        node.set_string(PropertyId::from("urn:name"), "Alice");
        let ds = Dataset::new().with_node(node);

        let saved = store.save_dataset_at("https://pod.example/card", &ds).await.unwrap();
        assert_eq!(saved.source_url(), Some("https://pod.example/card"));
        assert_eq!(store.save_count(), 1);

        let fetched = store.fetch_dataset("https://pod.example/card").await.unwrap();
        assert_eq!(fetched, saved);
        let node = fetched.get_node("https://pod.example/card#me").unwrap();
        assert_eq!(node.get_string(&PropertyId::from("urn:name")), Some("Alice"));
    }

    #[tokio::test]
    async fn test_seed_is_not_a_save() {
        let store = MemoryStore::new();
        store.seed("https://pod.example/doc", &Dataset::new()).await.unwrap();
        assert_eq!(store.save_count(), 0);
        assert!(store.fetch_dataset("https://pod.example/doc").await.is_ok());
    }
}
