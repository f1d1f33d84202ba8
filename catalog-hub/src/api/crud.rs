//! Pass-through document handlers shared by every entity.

use super::{if_match, ApiResult, AppState};
use crate::config::Collections;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use catalog_hub_core::storage::{Document, WriteOptions, KEY_FIELD};
use catalog_hub_core::upsert::UpsertByKey;
use catalog_hub_core::Error;
use serde_json::{Map, Value};
use tracing::debug;

/// Binds a route prefix to its collection.
pub trait Entity: Send + Sync + 'static {
    const PATH: &'static str;

    fn collection(collections: &Collections) -> &str;
}

pub async fn list<E: Entity>(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    let docs = state.store.all(E::collection(&state.collections)).await?;
    Ok(Json(docs))
}

pub async fn create<E: Entity>(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<impl IntoResponse> {
    let doc = state
        .store
        .insert(E::collection(&state.collections), body, WriteOptions::default())
        .await?;
    let location = format!("{}/{}", E::PATH, doc.key().unwrap_or_default());
    debug!(location = %location, "document created");
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(doc)))
}

pub async fn detail<E: Entity>(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Document>> {
    let doc = state
        .store
        .document(E::collection(&state.collections), &key)
        .await?;
    Ok(Json(doc))
}

pub async fn replace<E: Entity>(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<Document>> {
    let doc = state
        .store
        .replace(
            E::collection(&state.collections),
            &key,
            body,
            WriteOptions::if_match(if_match(&headers)),
        )
        .await?;
    Ok(Json(doc))
}

pub async fn update<E: Entity>(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Map<String, Value>>,
) -> ApiResult<Json<Document>> {
    let doc = state
        .store
        .update(
            E::collection(&state.collections),
            &key,
            patch,
            WriteOptions::if_match(if_match(&headers)),
        )
        .await?;
    Ok(Json(doc))
}

/// `POST /{key}`: create the document if needed, then merge the body.
pub async fn upsert_key<E: Entity>(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> ApiResult<Json<Document>> {
    let doc = UpsertByKey::new(state.store.as_ref(), E::collection(&state.collections))
        .run(&key, patch)
        .await?;
    Ok(Json(doc))
}

/// `POST /` keyed by the body's own `_key`.
pub async fn upsert_body<E: Entity>(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<Document>> {
    let key = body_key(&body)?;
    let doc = UpsertByKey::new(state.store.as_ref(), E::collection(&state.collections))
        .run(&key, body)
        .await?;
    Ok(Json(doc))
}

pub(crate) fn body_key(body: &Map<String, Value>) -> Result<String, Error> {
    match body.get(KEY_FIELD).and_then(Value::as_str) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(Error::missing_fields(
            "_key is required",
            vec![KEY_FIELD.to_string()],
        )),
    }
}
