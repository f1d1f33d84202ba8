//! Named edges between user documents.

use crate::error::Result;
use crate::storage::{Document, DocumentStore, Filter};
use serde_json::Value;
use tracing::{debug, warn};

pub const FROM_FIELD: &str = "_from";
pub const TO_FIELD: &str = "_to";
pub const RELATIONSHIP_FIELD: &str = "relationship";

/// Users reachable over one outbound edge from `from_key`, each tagged with
/// the edge's `name` under `relationship`. Edges to missing users are skipped.
pub async fn connections(
    store: &dyn DocumentStore,
    users: &str,
    edges: &str,
    from_key: &str,
    limit: usize,
) -> Result<Vec<Document>> {
    let from = format!("{users}/{from_key}");
    let outbound = store
        .find(edges, &Filter::eq(FROM_FIELD, from.as_str()), Some(limit))
        .await?;

    let mut connected = Vec::with_capacity(outbound.len());
    for edge in outbound {
        let Some((collection, key)) = edge
            .get(TO_FIELD)
            .and_then(Value::as_str)
            .and_then(|id| id.split_once('/'))
        else {
            warn!(edges, edge = edge.key().unwrap_or_default(), "edge without a usable _to");
            continue;
        };
        let mut vertex = match store.document(collection, key).await {
            Ok(vertex) => vertex.into_map(),
            Err(e) if e.is_not_found() => {
                debug!(from = %from, to = %key, "skipping edge to missing vertex");
                continue;
            }
            Err(e) => return Err(e),
        };
        vertex.insert(
            RELATIONSHIP_FIELD.into(),
            edge.get("name").cloned().unwrap_or(Value::Null),
        );
        connected.push(Document::new(vertex));
    }
    Ok(connected)
}
