//! Document store interface and the filesystem-backed engine.

pub mod document;
pub mod filter;
pub mod fs;


use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use document::{patch_at, validate_key, Document, ID_FIELD, KEY_FIELD, REV_FIELD};
pub use filter::Filter;
pub use fs::FileStore;

/// Per-write options.
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    /// Only write if the stored `_rev` still equals this revision.
    pub if_match: Option<String>,
    /// Flush the write to disk before returning.
    pub wait_for_sync: bool,
}

impl WriteOptions {
    pub fn if_match(rev: Option<String>) -> Self {
        Self {
            if_match: rev,
            ..Self::default()
        }
    }

    pub fn synced() -> Self {
        Self {
            wait_for_sync: true,
            ..Self::default()
        }
    }
}

/// Collections of JSON documents addressed by key.
///
/// Each call is atomic for the documents it touches; nothing spans calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn document(&self, collection: &str, key: &str) -> Result<Document>;

    /// Every document in the collection, ordered by key.
    async fn all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Matching documents ordered by key, at most `limit` of them.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// Store a new document. A key is generated when `_key` is absent.
    async fn insert(
        &self,
        collection: &str,
        body: Map<String, Value>,
        opts: WriteOptions,
    ) -> Result<Document>;

    /// Merge `patch` into an existing document and return the new version.
    async fn update(
        &self,
        collection: &str,
        key: &str,
        patch: Map<String, Value>,
        opts: WriteOptions,
    ) -> Result<Document>;

    /// Swap the whole body of an existing document.
    async fn replace(
        &self,
        collection: &str,
        key: &str,
        body: Map<String, Value>,
        opts: WriteOptions,
    ) -> Result<Document>;

    /// Select up to `limit` matches in key order, merge `patch` into each and
    /// return the new versions, all under one exclusive section. Two
    /// concurrent callers never both see a document in its pre-patch state.
    async fn update_where(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Map<String, Value>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;
}
