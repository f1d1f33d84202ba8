//! Pending/ready work queue kept inside document status fields.
//!
//! Ingestion marks records `pending`; consumers claim a bounded batch, which
//! flips the claimed records to `ready` in the same store operation.

use crate::error::Result;
use crate::storage::{patch_at, Document, DocumentStore, Filter};
use serde_json::Value;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyncStatus {
    Pending,
    Ready,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Ready => "ready",
        }
    }
}

impl From<SyncStatus> for Value {
    fn from(status: SyncStatus) -> Self {
        Value::String(status.as_str().to_string())
    }
}

/// Which status field a claim watches, and what else a claimable record needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimSpec {
    pub status_path: &'static str,
    pub requires: Option<&'static str>,
}

impl ClaimSpec {
    /// Platform property mappings waiting to be synced; only mapped ones count.
    pub const PROPERTY_SYNC: ClaimSpec = ClaimSpec {
        status_path: "status",
        requires: Some("mappingId"),
    };

    /// Stuff records waiting to be indexed.
    pub const STUFF_INDEX: ClaimSpec = ClaimSpec {
        status_path: "status.index",
        requires: None,
    };

    fn filter(&self) -> Filter {
        let pending = Filter::eq(self.status_path, SyncStatus::Pending);
        match self.requires {
            Some(field) => pending.and(Filter::not_null(field)),
            None => pending,
        }
    }
}

/// Claim up to `limit` pending records and return them as now `ready`.
///
/// Selection and the status flip are one store operation, so a record is
/// handed to at most one caller per pending period.
pub async fn claim_pending(
    store: &dyn DocumentStore,
    collection: &str,
    spec: ClaimSpec,
    limit: usize,
) -> Result<Vec<Document>> {
    let claimed = store
        .update_where(
            collection,
            &spec.filter(),
            patch_at(spec.status_path, SyncStatus::Ready),
            Some(limit),
        )
        .await?;
    info!(
        collection,
        status = spec.status_path,
        claimed = claimed.len(),
        limit,
        "pending batch claimed"
    );
    Ok(claimed)
}

/// Mark every record tagged with `category_id` as needing its satisfaction
/// state recomputed.
pub async fn invalidate_by_category(
    store: &dyn DocumentStore,
    collection: &str,
    category_id: &str,
) -> Result<Vec<Document>> {
    let affected = store
        .update_where(
            collection,
            &Filter::eq("meta.category", category_id),
            patch_at("status.satisify", SyncStatus::Pending),
            None,
        )
        .await?;
    info!(
        collection,
        category = category_id,
        affected = affected.len(),
        "satisfaction invalidated"
    );
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, WriteOptions};
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn property_claim_skips_unmapped_and_flips_status() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        for doc in [
            json!({"_key": "a", "status": "pending", "mappingId": "m1"}),
            json!({"_key": "b", "status": "pending", "mappingId": null}),
            json!({"_key": "c", "status": "ready", "mappingId": "m2"}),
            json!({"_key": "d", "status": "pending"}),
        ] {
            store
                .insert("platform_properties", object(doc), WriteOptions::default())
                .await
                .unwrap();
        }

        let claimed = claim_pending(&store, "platform_properties", ClaimSpec::PROPERTY_SYNC, 500)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].key(), Some("a"));
        assert_eq!(claimed[0].get("status"), Some(&json!("ready")));

        let again = claim_pending(&store, "platform_properties", ClaimSpec::PROPERTY_SYNC, 500)
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn stuff_claim_respects_limit_and_sibling_status() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        for i in 0..5 {
            store
                .insert(
                    "my_stuff",
                    object(json!({
                        "_key": format!("s{i}"),
                        "status": {"index": "pending", "satisify": "ready"},
                    })),
                    WriteOptions::default(),
                )
                .await
                .unwrap();
        }

        let claimed = claim_pending(&store, "my_stuff", ClaimSpec::STUFF_INDEX, 3).await.unwrap();
        assert_eq!(claimed.len(), 3);
        for doc in &claimed {
            assert_eq!(doc.get("status"), Some(&json!({"index": "ready", "satisify": "ready"})));
        }
        let rest = claim_pending(&store, "my_stuff", ClaimSpec::STUFF_INDEX, 3).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn invalidation_targets_category_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        for (key, category) in [("a", "c1"), ("b", "c2"), ("c", "c1")] {
            store
                .insert(
                    "my_stuff",
                    object(json!({
                        "_key": key,
                        "meta": {"category": category},
                        "status": {"index": "ready"},
                    })),
                    WriteOptions::default(),
                )
                .await
                .unwrap();
        }
        let affected = invalidate_by_category(&store, "my_stuff", "c1").await.unwrap();
        assert_eq!(affected.len(), 2);
        for doc in &affected {
            assert_eq!(doc.get_path("status.satisify"), Some(&json!("pending")));
            assert_eq!(doc.get_path("status.index"), Some(&json!("ready")));
        }
        let other = store.document("my_stuff", "b").await.unwrap();
        assert_eq!(other.get_path("status.satisify"), None);
    }
}
