//! Filesystem-backed document store.
//! Each collection is a directory and each document a `<key>.json` file;
//! everything is loaded at startup and served from memory.

use super::document::{validate_key, Document, KEY_FIELD};
use super::{DocumentStore, Filter, WriteOptions};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

type Collection = BTreeMap<String, Document>;

pub struct FileStore {
    dir: PathBuf,
    collections: RwLock<HashMap<String, Collection>>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let mut collections: HashMap<String, Collection> = HashMap::new();
        let mut loaded = 0usize;
        for entry in WalkDir::new(&dir).min_depth(2).max_depth(2) {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }
            let Some(collection) = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
            else {
                continue;
            };
            let bytes = std::fs::read(path)?;
            let doc: Document = match serde_json::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable document");
                    continue;
                }
            };
            let key = match doc.key() {
                Some(key) => key.to_string(),
                None => match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) => stem.to_string(),
                    None => continue,
                },
            };
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(key, doc);
            loaded += 1;
        }
        info!(
            dir = %dir.display(),
            documents = loaded,
            collections = collections.len(),
            "document store opened"
        );
        Ok(Self {
            dir,
            collections: RwLock::new(collections),
        })
    }

    fn path(&self, collection: &str, key: &str) -> PathBuf {
        self.dir.join(collection).join(format!("{}.json", key))
    }

    fn persist(&self, collection: &str, key: &str, doc: &Document, sync: bool) -> Result<()> {
        let path = self.path(collection, key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(doc)?;
        if sync {
            let mut file = File::create(&path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        } else {
            std::fs::write(&path, bytes)?;
        }
        Ok(())
    }
}

fn next_rev() -> String {
    Uuid::new_v4().simple().to_string()
}

fn validate_collection(name: &str) -> Result<()> {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(Error::InvalidKey(name.to_string()))
    }
}

fn check_rev(
    collection: &str,
    key: &str,
    current: &Document,
    if_match: Option<&str>,
) -> Result<()> {
    let Some(expected) = if_match else {
        return Ok(());
    };
    let actual = current.rev().unwrap_or_default();
    if expected == actual {
        Ok(())
    } else {
        Err(Error::Conflict {
            collection: collection.to_string(),
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn document(&self, collection: &str, key: &str) -> Result<Document> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
            .ok_or_else(|| Error::not_found(collection, key))
    }

    async fn all(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let guard = self.collections.read();
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| filter.matches(doc))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        collection: &str,
        body: Map<String, Value>,
        opts: WriteOptions,
    ) -> Result<Document> {
        validate_collection(collection)?;
        let key = match body.get(KEY_FIELD) {
            Some(Value::String(key)) => key.clone(),
            Some(other) => return Err(Error::InvalidKey(other.to_string())),
            None => next_rev(),
        };
        validate_key(&key)?;

        let mut guard = self.collections.write();
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.contains_key(&key) {
            return Err(Error::duplicate_key(collection, &key));
        }
        let mut doc = Document::new(body);
        doc.stamp(collection, &key, next_rev());
        self.persist(collection, &key, &doc, opts.wait_for_sync)?;
        docs.insert(key.clone(), doc.clone());
        debug!(collection, key = %key, "document inserted");
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        patch: Map<String, Value>,
        opts: WriteOptions,
    ) -> Result<Document> {
        let mut guard = self.collections.write();
        let current = guard
            .get(collection)
            .and_then(|docs| docs.get(key))
            .ok_or_else(|| Error::not_found(collection, key))?;
        check_rev(collection, key, current, opts.if_match.as_deref())?;
        let mut next = current.merged(patch);
        next.stamp(collection, key, next_rev());
        self.persist(collection, key, &next, opts.wait_for_sync)?;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), next.clone());
        Ok(next)
    }

    async fn replace(
        &self,
        collection: &str,
        key: &str,
        body: Map<String, Value>,
        opts: WriteOptions,
    ) -> Result<Document> {
        let mut guard = self.collections.write();
        let current = guard
            .get(collection)
            .and_then(|docs| docs.get(key))
            .ok_or_else(|| Error::not_found(collection, key))?;
        check_rev(collection, key, current, opts.if_match.as_deref())?;
        let mut next = Document::new(body);
        next.stamp(collection, key, next_rev());
        self.persist(collection, key, &next, opts.wait_for_sync)?;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), next.clone());
        Ok(next)
    }

    async fn update_where(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Map<String, Value>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(Vec::new());
        };
        let keys: Vec<String> = docs
            .iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(key, _)| key.clone())
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        let updated: Vec<Document> = keys
            .iter()
            .filter_map(|key| docs.get(key))
            .map(|current| {
                let mut next = current.merged(patch.clone());
                next.stamp(collection, current.key().unwrap_or_default(), next_rev());
                next
            })
            .collect();

        // Memory only changes once every file is written.
        for (written, next) in updated.iter().enumerate() {
            let key = next.key().unwrap_or_default();
            if let Err(err) = self.persist(collection, key, next, false) {
                for prior in &updated[..written] {
                    let key = prior.key().unwrap_or_default();
                    let Some(previous) = docs.get(key) else {
                        continue;
                    };
                    if let Err(restore) = self.persist(collection, key, previous, false) {
                        warn!(
                            collection,
                            key,
                            error = %restore,
                            "failed to restore document after aborted batch"
                        );
                    }
                }
                warn!(collection, failed = key, error = %err, "filtered update aborted");
                return Err(err);
            }
        }
        for next in &updated {
            docs.insert(next.key().unwrap_or_default().to_string(), next.clone());
        }
        debug!(collection, updated = updated.len(), "filtered update applied");
        Ok(updated)
    }
}
