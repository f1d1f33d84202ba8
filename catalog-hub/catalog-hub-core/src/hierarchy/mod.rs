//! Ancestor path materialization for parent-pointer category trees.
//!
//! A node points at its parent through `pid`, which names the parent's `id`
//! within the same `source`. [`PathResolver`] walks those links up to the
//! root and [`Materializer`] caches the resulting root-to-leaf `names` and
//! `ids` on the node itself.


use crate::error::{Error, Result};
use crate::storage::{Document, DocumentStore, Filter, WriteOptions};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, warn};

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// The tree-relevant fields of a category document.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CategoryNode {
    #[serde(rename = "_key", default)]
    pub key: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub pid: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CategoryNode {
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(doc.as_map().clone()))?)
    }

    fn parent_id(&self) -> Option<&Value> {
        self.pid.as_ref().filter(|pid| !pid.is_null())
    }
}

/// Labels and ids from the root down to a node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AncestorChain {
    pub names: Vec<String>,
    pub ids: Vec<Value>,
}

impl AncestorChain {
    /// Number of nodes on the path, the leaf included.
    pub fn depth(&self) -> usize {
        self.ids.len()
    }

    fn into_patch(self) -> Map<String, Value> {
        let mut patch = Map::new();
        patch.insert(
            "names".into(),
            Value::Array(self.names.into_iter().map(Value::String).collect()),
        );
        patch.insert("ids".into(), Value::Array(self.ids));
        patch
    }
}

/// How the patch and the derived path fields reach the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaterializeMode {
    /// Write the patch, re-read, then write `names`/`ids`. A failure between
    /// the two writes leaves the node with stale derived fields.
    #[default]
    TwoPhase,
    /// Compute the path against the patched preview and write everything in
    /// one revision-guarded update.
    SingleWrite,
}

impl FromStr for MaterializeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "two-phase" => Ok(MaterializeMode::TwoPhase),
            "single-write" => Ok(MaterializeMode::SingleWrite),
            other => Err(format!(
                "unknown materialize mode {other:?} (expected two-phase or single-write)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchyConfig {
    pub max_depth: usize,
    pub mode: MaterializeMode,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            mode: MaterializeMode::default(),
        }
    }
}

/// Walks `pid` links to the root of a node's tree.
pub struct PathResolver<'a> {
    store: &'a dyn DocumentStore,
    collection: &'a str,
    max_depth: usize,
}

impl<'a> PathResolver<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: &'a str, max_depth: usize) -> Self {
        Self {
            store,
            collection,
            max_depth,
        }
    }

    /// Resolve the chain for `leaf`, seeded with the leaf's own label.
    ///
    /// A parent lookup with no match marks the root; a dangling `pid` is
    /// therefore indistinguishable from a root. When several documents share
    /// the parent's `(source, id)`, the lowest key wins.
    pub async fn resolve(&self, leaf: &CategoryNode) -> Result<AncestorChain> {
        let source = leaf.source.clone().map(Value::String).unwrap_or(Value::Null);
        let mut names = vec![leaf.name.clone().unwrap_or_default()];
        let mut ids = vec![leaf.id.clone()];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(leaf.id.to_string());

        let mut pid = leaf.parent_id().cloned();
        while let Some(parent_id) = pid.take() {
            let filter =
                Filter::eq("source", source.clone()).and(Filter::eq("id", parent_id.clone()));
            let mut parents = self.store.find(self.collection, &filter, Some(2)).await?.into_iter();
            let Some(parent) = parents.next() else {
                break;
            };
            if let Some(other) = parents.next() {
                warn!(
                    collection = self.collection,
                    source = %source,
                    id = %parent_id,
                    chosen = parent.key().unwrap_or_default(),
                    ignored = other.key().unwrap_or_default(),
                    "ambiguous parent id, taking lowest key"
                );
            }

            if ids.len() >= self.max_depth {
                return Err(Error::DepthExceeded {
                    max_depth: self.max_depth,
                });
            }
            let parent = CategoryNode::from_document(&parent)?;
            if !visited.insert(parent.id.to_string()) {
                return Err(Error::CycleDetected { id: parent.id });
            }
            pid = parent.parent_id().cloned();
            names.push(parent.name.unwrap_or_default());
            ids.push(parent.id);
        }

        names.reverse();
        ids.reverse();
        Ok(AncestorChain { names, ids })
    }
}

/// Applies patches to category nodes and refreshes their cached paths.
pub struct Materializer<'a> {
    store: &'a dyn DocumentStore,
    collection: &'a str,
    config: &'a HierarchyConfig,
}

impl<'a> Materializer<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        collection: &'a str,
        config: &'a HierarchyConfig,
    ) -> Self {
        Self {
            store,
            collection,
            config,
        }
    }

    fn resolver(&self) -> PathResolver<'a> {
        PathResolver::new(self.store, self.collection, self.config.max_depth)
    }

    /// Merge `patch` into the node at `key` and store its ancestor path.
    ///
    /// `if_match` guards the first write (two-phase) or the only write
    /// (single-write) against concurrent modification.
    pub async fn materialize(
        &self,
        key: &str,
        patch: Map<String, Value>,
        if_match: Option<String>,
    ) -> Result<Document> {
        match self.config.mode {
            MaterializeMode::TwoPhase => self.two_phase(key, patch, if_match).await,
            MaterializeMode::SingleWrite => self.single_write(key, patch, if_match).await,
        }
    }

    async fn two_phase(
        &self,
        key: &str,
        patch: Map<String, Value>,
        if_match: Option<String>,
    ) -> Result<Document> {
        self.store
            .update(self.collection, key, patch, WriteOptions::if_match(if_match))
            .await?;
        let node = self.store.document(self.collection, key).await?;
        let chain = self.resolver().resolve(&CategoryNode::from_document(&node)?).await?;
        debug!(collection = self.collection, key, depth = chain.depth(), "ancestor path resolved");
        self.store
            .update(self.collection, key, chain.into_patch(), WriteOptions::default())
            .await
    }

    async fn single_write(
        &self,
        key: &str,
        mut patch: Map<String, Value>,
        if_match: Option<String>,
    ) -> Result<Document> {
        let current = self.store.document(self.collection, key).await?;
        let expected = match if_match {
            Some(rev) => rev,
            None => current.rev().unwrap_or_default().to_string(),
        };
        let preview = current.merged(patch.clone());
        let chain = self.resolver().resolve(&CategoryNode::from_document(&preview)?).await?;
        debug!(collection = self.collection, key, depth = chain.depth(), "ancestor path resolved");
        patch.extend(chain.into_patch());
        self.store
            .update(self.collection, key, patch, WriteOptions::if_match(Some(expected)))
            .await
    }
}
