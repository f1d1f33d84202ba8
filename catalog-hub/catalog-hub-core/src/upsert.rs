//! Create-or-merge writes addressed by a caller-chosen key.

use crate::error::Result;
use crate::storage::{Document, DocumentStore, WriteOptions, KEY_FIELD};
use serde_json::{Map, Value};
use tracing::debug;

/// Makes sure a document exists under `key`, then merges a patch into it.
///
/// Two concurrent callers with the same key both succeed: the insert loser
/// sees a duplicate key and falls through to the merge.
pub struct UpsertByKey<'a> {
    store: &'a dyn DocumentStore,
    collection: &'a str,
    keep_existing: bool,
}

impl<'a> UpsertByKey<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: &'a str) -> Self {
        Self {
            store,
            collection,
            keep_existing: false,
        }
    }

    /// Leave an existing document untouched and return it as stored.
    pub fn keep_existing(mut self) -> Self {
        self.keep_existing = true;
        self
    }

    pub async fn run(&self, key: &str, patch: Map<String, Value>) -> Result<Document> {
        match self.store.document(self.collection, key).await {
            Ok(existing) if self.keep_existing => return Ok(existing),
            Ok(_) => {}
            Err(e) if e.is_not_found() => self.create_placeholder(key).await?,
            Err(e) => return Err(e),
        }
        self.store
            .update(self.collection, key, patch, WriteOptions::default())
            .await
    }

    async fn create_placeholder(&self, key: &str) -> Result<()> {
        let mut body = Map::new();
        body.insert(KEY_FIELD.into(), Value::String(key.to_string()));
        match self.store.insert(self.collection, body, WriteOptions::synced()).await {
            Ok(_) => {
                debug!(collection = self.collection, key, "upsert created document");
                Ok(())
            }
            Err(e) if e.is_duplicate_key() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, Filter};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use tempfile::TempDir;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn creates_then_merges() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let upsert = UpsertByKey::new(&store, "personas");

        let first = upsert.run("p1", object(json!({"age": 30, "tags": {"a": 1}}))).await.unwrap();
        assert_eq!(first.key(), Some("p1"));
        assert_eq!(first.get("age"), Some(&json!(30)));

        let second = upsert.run("p1", object(json!({"tags": {"b": 2}}))).await.unwrap();
        assert_eq!(second.get("age"), Some(&json!(30)));
        assert_eq!(second.get("tags"), Some(&json!({"a": 1, "b": 2})));
        assert_eq!(store.all("personas").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn keep_existing_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let upsert = UpsertByKey::new(&store, "my_stuff").keep_existing();

        let created = upsert.run("s1", object(json!({"title": "lamp"}))).await.unwrap();
        assert_eq!(created.get("title"), Some(&json!("lamp")));

        let kept = upsert.run("s1", object(json!({"title": "desk"}))).await.unwrap();
        assert_eq!(kept.get("title"), Some(&json!("lamp")));
        assert_eq!(kept.rev(), created.rev());
    }

    #[tokio::test]
    async fn concurrent_upserts_share_one_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let a = UpsertByKey::new(&store, "users");
        let b = UpsertByKey::new(&store, "users");

        let (left, right) = tokio::join!(
            a.run("u1", object(json!({"left": true}))),
            b.run("u1", object(json!({"right": true}))),
        );
        left.unwrap();
        right.unwrap();

        let doc = store.document("users", "u1").await.unwrap();
        assert_eq!(doc.get("left"), Some(&json!(true)));
        assert_eq!(doc.get("right"), Some(&json!(true)));
    }

    #[derive(Debug, PartialEq)]
    enum Call {
        Insert {
            body: Value,
            wait_for_sync: bool,
        },
        Update {
            key: String,
        },
    }

    /// Logs every write before handing it to the wrapped store.
    struct RecordingStore {
        inner: FileStore,
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingStore {
        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn document(&self, collection: &str, key: &str) -> Result<Document> {
            self.inner.document(collection, key).await
        }

        async fn all(&self, collection: &str) -> Result<Vec<Document>> {
            self.inner.all(collection).await
        }

        async fn find(
            &self,
            collection: &str,
            filter: &Filter,
            limit: Option<usize>,
        ) -> Result<Vec<Document>> {
            self.inner.find(collection, filter, limit).await
        }

        async fn insert(
            &self,
            collection: &str,
            body: Map<String, Value>,
            opts: WriteOptions,
        ) -> Result<Document> {
            self.calls.lock().push(Call::Insert {
                body: Value::Object(body.clone()),
                wait_for_sync: opts.wait_for_sync,
            });
            self.inner.insert(collection, body, opts).await
        }

        async fn update(
            &self,
            collection: &str,
            key: &str,
            patch: Map<String, Value>,
            opts: WriteOptions,
        ) -> Result<Document> {
            self.calls.lock().push(Call::Update {
                key: key.to_string(),
            });
            self.inner.update(collection, key, patch, opts).await
        }

        async fn replace(
            &self,
            collection: &str,
            key: &str,
            body: Map<String, Value>,
            opts: WriteOptions,
        ) -> Result<Document> {
            self.inner.replace(collection, key, body, opts).await
        }

        async fn update_where(
            &self,
            collection: &str,
            filter: &Filter,
            patch: Map<String, Value>,
            limit: Option<usize>,
        ) -> Result<Vec<Document>> {
            self.inner.update_where(collection, filter, patch, limit).await
        }
    }

    #[tokio::test]
    async fn synced_placeholder_precedes_merge_and_is_never_recreated() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordingStore {
            inner: FileStore::open(temp_dir.path()).unwrap(),
            calls: Mutex::new(Vec::new()),
        };
        let upsert = UpsertByKey::new(&store, "personas");

        upsert.run("p1", object(json!({"age": 30}))).await.unwrap();
        assert_eq!(
            store.take(),
            vec![
                Call::Insert {
                    body: json!({"_key": "p1"}),
                    wait_for_sync: true,
                },
                Call::Update { key: "p1".into() },
            ]
        );

        let doc = upsert.run("p1", object(json!({"age": 31}))).await.unwrap();
        assert_eq!(doc.get("age"), Some(&json!(31)));
        assert_eq!(store.take(), vec![Call::Update { key: "p1".into() }]);
    }
}
