//! Datasets: unordered collections of nodes with an optional source URL.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::model::id::{anchor_node_url, is_local_name};
use crate::model::Node;

/// A collection of nodes, addressable by its source URL once persisted.
///
/// Updates are functional: [`Dataset::with_node`] returns a new dataset and
/// leaves `self` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
    #[serde(default)]
    nodes: FxHashMap<String, Node>,
}

impl Dataset {
    /// Creates an empty dataset that has never been saved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty dataset already known to live at `url`.
    pub fn with_source(url: impl Into<String>) -> Self {
        Self {
            source_url: Some(url.into()),
            nodes: FxHashMap::default(),
        }
    }

    /// The URL this dataset was fetched from or saved to, if any.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the dataset holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Looks up a node by URL.
    ///
    /// A local name also matches the node it was anchored to when this
    /// dataset has a source URL.
    pub fn get_node(&self, url: &str) -> Option<&Node> {
        if let Some(node) = self.nodes.get(url) {
            return Some(node);
        }
        match (&self.source_url, is_local_name(url)) {
            (Some(source), true) => self.nodes.get(&anchor_node_url(url, source)),
            _ => None,
        }
    }

    /// Returns a copy of this dataset with `node` inserted, replacing any node with the same URL.
    pub fn with_node(&self, node: Node) -> Dataset {
        let mut next = self.clone();
        next.set_node(node);
        next
    }

    /// Inserts `node` in place, replacing any node with the same URL.
    pub fn set_node(&mut self, node: Node) {
        self.nodes.insert(node.url().to_string(), node);
    }

    /// Records where this dataset lives and anchors every local node name to it.
    pub fn persisted_at(mut self, url: &str) -> Dataset {
        let nodes = std::mem::take(&mut self.nodes);
        for (_, mut node) in nodes {
            node.anchor_to(url);
            self.set_node(node);
        }
        self.source_url = Some(url.to_string());
        self
    }
}
