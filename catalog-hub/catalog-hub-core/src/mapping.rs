//! Links between platform taxonomies and the standard taxonomy.

use crate::error::{Error, Result};
use crate::storage::{Document, DocumentStore, Filter};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

/// A label given either as one string or as a root-to-leaf path.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NameQuery {
    Label(String),
    Path(Vec<String>),
}

impl NameQuery {
    /// The label a document's own `name` is compared against.
    pub fn own_name(&self) -> Option<&str> {
        match self {
            NameQuery::Label(label) => Some(label.as_str()).filter(|l| !l.trim().is_empty()),
            NameQuery::Path(path) => path.last().map(String::as_str),
        }
    }

    /// The labels that must all appear in a document's `names`.
    ///
    /// A plain string is treated as whitespace-separated segments.
    pub fn segments(&self) -> Vec<Value> {
        match self {
            NameQuery::Label(label) => label
                .split_whitespace()
                .map(|s| Value::String(s.to_string()))
                .collect(),
            NameQuery::Path(path) => path.iter().cloned().map(Value::String).collect(),
        }
    }
}

/// Body of a bulk relabel request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingUpdate {
    pub source: Option<String>,
    pub name: Option<String>,
    pub mapping_id: Option<Value>,
    pub mapping_name: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MappingQuery {
    pub source: Option<String>,
    pub name: Option<NameQuery>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PropertyMappingQuery {
    pub source: Option<String>,
    pub category: Option<NameQuery>,
}

/// Body of a stuff mapping rewrite: move `source` records from `old` to `new`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MappingRewrite {
    pub source: Option<String>,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Decode a request body, reporting shape errors as validation failures.
pub fn parse_body<T: for<'de> Deserialize<'de>>(body: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(body.clone()))
        .map_err(|err| Error::missing_fields(err.to_string(), Vec::new()))
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn require(fields: &[(&str, bool)]) -> Result<()> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name.to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    let all: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    Err(Error::missing_fields(
        format!("all of {} are required", all.join("/")),
        missing,
    ))
}

fn str_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

/// Set `mappingId`/`mappingName` on every node of `source` named `name`.
///
/// Validation happens before any write; a missing field writes nothing.
pub async fn apply_mapping(
    store: &dyn DocumentStore,
    collection: &str,
    update: &MappingUpdate,
) -> Result<Vec<Document>> {
    require(&[
        ("source", str_present(&update.source)),
        ("name", str_present(&update.name)),
        ("mappingId", is_present(update.mapping_id.as_ref())),
        ("mappingName", is_present(update.mapping_name.as_ref())),
    ])?;
    let source = update.source.as_deref().unwrap_or_default();
    let name = update.name.as_deref().unwrap_or_default();

    let filter = Filter::eq("name", name).and(Filter::eq("source", source));
    let mut patch = Map::new();
    patch.insert("mappingId".into(), update.mapping_id.clone().unwrap_or_default());
    patch.insert("mappingName".into(), update.mapping_name.clone().unwrap_or_default());
    let updated = store.update_where(collection, &filter, patch, None).await?;
    info!(collection, source, name, matched = updated.len(), "mapping applied");
    Ok(updated)
}

/// Find the node of `source` matching a label or a path, if any.
///
/// A node matches when its own `name` equals the query's last label, or when
/// every queried label is an element of its materialized `names`.
pub async fn lookup_mapping(
    store: &dyn DocumentStore,
    collection: &str,
    query: &MappingQuery,
) -> Result<Option<Document>> {
    let own_name = query.name.as_ref().and_then(NameQuery::own_name);
    require(&[
        ("source", str_present(&query.source)),
        ("name", own_name.is_some()),
    ])?;
    let source = query.source.as_deref().unwrap_or_default();
    let own_name = own_name.unwrap_or_default();
    let segments = query.name.as_ref().map(NameQuery::segments).unwrap_or_default();

    let filter = Filter::eq("source", source)
        .and(Filter::eq("name", own_name).or(Filter::all_in(segments, "names")));
    Ok(store.find(collection, &filter, Some(1)).await?.into_iter().next())
}

/// All property mappings recorded for a platform category.
pub async fn lookup_property_mapping(
    store: &dyn DocumentStore,
    collection: &str,
    query: &PropertyMappingQuery,
) -> Result<Vec<Document>> {
    let category = query.category.as_ref().and_then(NameQuery::own_name);
    require(&[
        ("source", str_present(&query.source)),
        ("category", category.is_some()),
    ])?;
    let source = query.source.as_deref().unwrap_or_default();
    let category = category.unwrap_or_default();

    let filter = Filter::eq("source", source).and(Filter::eq("category", category));
    store.find(collection, &filter, None).await
}

/// Point every `source` record mapped to `old` at `new` instead.
pub async fn rewrite_mapping(
    store: &dyn DocumentStore,
    collection: &str,
    rewrite: &MappingRewrite,
) -> Result<Vec<Document>> {
    require(&[
        ("source", str_present(&rewrite.source)),
        ("old", is_present(rewrite.old.as_ref())),
        ("new", is_present(rewrite.new.as_ref())),
    ])?;
    let source = rewrite.source.as_deref().unwrap_or_default();
    let old = rewrite.old.clone().unwrap_or_default();
    let new = rewrite.new.clone().unwrap_or_default();

    let filter = Filter::eq("mappingId", old.clone()).and(Filter::eq("source", source));
    let mut patch = Map::new();
    patch.insert("mappingId".into(), new.clone());
    let updated = store.update_where(collection, &filter, patch, None).await?;
    info!(
        collection,
        source,
        old = %old,
        new = %new,
        rewritten = updated.len(),
        "mapping rewritten"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, WriteOptions};
    use serde_json::json;
    use tempfile::TempDir;

    const NODES: &str = "platform_categories";

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn store_with(docs: Vec<Value>) -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        for doc in docs {
            store
                .insert(NODES, object(doc), WriteOptions::default())
                .await
                .unwrap();
        }
        (store, temp_dir)
    }

    fn cases() -> Value {
        json!({
            "_key": "n5", "source": "acme", "id": 5, "name": "Cases",
            "names": ["Electronics", "Phones", "Cases"]
        })
    }

    #[tokio::test]
    async fn apply_mapping_updates_every_match() {
        let (store, _dir) = store_with(vec![
            json!({"_key": "a", "source": "acme", "name": "Cases"}),
            json!({"_key": "b", "source": "acme", "name": "Cases"}),
            json!({"_key": "c", "source": "other", "name": "Cases"}),
        ])
        .await;
        let update: MappingUpdate = parse_body(&object(json!({
            "source": "acme", "name": "Cases", "mappingId": 42, "mappingName": "Phone Cases"
        })))
        .unwrap();

        let updated = apply_mapping(&store, NODES, &update).await.unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|d| d.get("mappingId") == Some(&json!(42))));
        let untouched = store.document(NODES, "c").await.unwrap();
        assert_eq!(untouched.get("mappingId"), None);
    }

    #[tokio::test]
    async fn apply_mapping_with_missing_field_writes_nothing() {
        let (store, _dir) =
            store_with(vec![json!({"_key": "a", "source": "acme", "name": "Cases"})]).await;
        let before = store.document(NODES, "a").await.unwrap();

        for body in [
            json!({"name": "Cases", "mappingId": 1, "mappingName": "x"}),
            json!({"source": "acme", "name": "", "mappingId": 1, "mappingName": "x"}),
            json!({"source": "acme", "name": "Cases", "mappingName": "x"}),
            json!({"source": "acme", "name": "Cases", "mappingId": 1, "mappingName": null}),
        ] {
            let update: MappingUpdate = parse_body(&object(body)).unwrap();
            let err = apply_mapping(&store, NODES, &update).await.unwrap_err();
            assert!(
                matches!(err, Error::ValidationFailed { ref missing, .. } if missing.len() == 1)
            );
        }
        assert_eq!(store.document(NODES, "a").await.unwrap(), before);
    }

    #[tokio::test]
    async fn lookup_by_own_name_or_path_membership() {
        let (store, _dir) = store_with(vec![cases()]).await;

        let by_name: MappingQuery =
            parse_body(&object(json!({"source": "acme", "name": "Cases"}))).unwrap();
        assert!(lookup_mapping(&store, NODES, &by_name).await.unwrap().is_some());

        let member: MappingQuery =
            parse_body(&object(json!({"source": "acme", "name": ["Phones"]}))).unwrap();
        assert!(lookup_mapping(&store, NODES, &member).await.unwrap().is_some());

        let unknown: MappingQuery =
            parse_body(&object(json!({"source": "acme", "name": ["Phones", "Unknown"]}))).unwrap();
        assert!(lookup_mapping(&store, NODES, &unknown).await.unwrap().is_none());

        let spaced: MappingQuery =
            parse_body(&object(json!({"source": "acme", "name": "Electronics Phones"}))).unwrap();
        assert!(lookup_mapping(&store, NODES, &spaced).await.unwrap().is_some());

        let wrong_source: MappingQuery =
            parse_body(&object(json!({"source": "zeta", "name": "Cases"}))).unwrap();
        assert!(lookup_mapping(&store, NODES, &wrong_source).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_requires_source_and_name() {
        let (store, _dir) = store_with(vec![cases()]).await;
        for body in [json!({"name": "Cases"}), json!({"source": "acme", "name": []})] {
            let query: MappingQuery = parse_body(&object(body)).unwrap();
            let err = lookup_mapping(&store, NODES, &query).await.unwrap_err();
            assert!(matches!(err, Error::ValidationFailed { .. }));
        }
    }

    #[tokio::test]
    async fn property_mapping_uses_last_category_label() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        for (key, category) in [("p1", "Cases"), ("p2", "Cases"), ("p3", "Phones")] {
            store
                .insert(
                    "platform_properties",
                    object(json!({"_key": key, "source": "acme", "category": category})),
                    WriteOptions::default(),
                )
                .await
                .unwrap();
        }
        let query: PropertyMappingQuery =
            parse_body(&object(json!({"source": "acme", "category": ["Phones", "Cases"]})))
                .unwrap();
        let found = lookup_property_mapping(&store, "platform_properties", &query).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn rewrite_moves_only_matching_source() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        for (key, source, mapping) in
            [("a", "acme", "m1"), ("b", "acme", "m2"), ("c", "zeta", "m1")]
        {
            store
                .insert(
                    "my_stuff",
                    object(json!({"_key": key, "source": source, "mappingId": mapping})),
                    WriteOptions::default(),
                )
                .await
                .unwrap();
        }
        let rewrite: MappingRewrite =
            parse_body(&object(json!({"source": "acme", "old": "m1", "new": "m9"}))).unwrap();
        let updated = rewrite_mapping(&store, "my_stuff", &rewrite).await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].key(), Some("a"));
        assert_eq!(
            store.document("my_stuff", "c").await.unwrap().get("mappingId"),
            Some(&json!("m1"))
        );

        let incomplete: MappingRewrite =
            parse_body(&object(json!({"source": "acme", "old": "m1"}))).unwrap();
        let err = rewrite_mapping(&store, "my_stuff", &incomplete).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ValidationFailed { ref missing, .. } if missing == &vec!["new".to_string()]
        ));
    }
}
