//! Platform-specific category trees and their links to the standard taxonomy.

use super::crud::{self, Entity};
use super::{if_match, ApiResult, AppState};
use crate::config::Collections;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, patch, post},
    Json, Router,
};
use catalog_hub_core::hierarchy::Materializer;
use catalog_hub_core::mapping::{self, MappingQuery, MappingUpdate};
use catalog_hub_core::storage::Document;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

pub const PATH: &str = "/platform-categories";

pub struct PlatformCategories;

impl Entity for PlatformCategories {
    const PATH: &'static str = PATH;

    fn collection(collections: &Collections) -> &str {
        &collections.platform_categories
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(crud::upsert_body::<PlatformCategories>))
        .route("/mapping", patch(relabel).post(lookup))
        .route("/fullpath/{key}", patch(fullpath))
        .route(
            "/{key}",
            get(crud::detail::<PlatformCategories>).patch(crud::update::<PlatformCategories>),
        )
}

#[derive(Serialize)]
pub struct RelabelResponse {
    pub result: &'static str,
    pub msg: &'static str,
    pub data: Map<String, Value>,
    pub matched: Vec<Document>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub success: bool,
    pub msg: &'static str,
    pub data: Vec<Document>,
}

/// Merge the patch and refresh the node's `names`/`ids`.
async fn fullpath(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Map<String, Value>>,
) -> ApiResult<Json<Document>> {
    let doc = Materializer::new(
        state.store.as_ref(),
        &state.collections.platform_categories,
        &state.hierarchy,
    )
    .materialize(&key, patch, if_match(&headers))
    .await?;
    Ok(Json(doc))
}

async fn relabel(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<RelabelResponse>> {
    let update: MappingUpdate = mapping::parse_body(&body)?;
    let matched = mapping::apply_mapping(
        state.store.as_ref(),
        &state.collections.platform_categories,
        &update,
    )
    .await?;
    info!(matched = matched.len(), "platform category mapping changed");
    Ok(Json(RelabelResponse {
        result: "success",
        msg: "platform category mapping changed.",
        data: body,
        matched,
    }))
}

async fn lookup(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<LookupResponse>> {
    let query: MappingQuery = mapping::parse_body(&body)?;
    let found = mapping::lookup_mapping(
        state.store.as_ref(),
        &state.collections.platform_categories,
        &query,
    )
    .await?;
    Ok(Json(LookupResponse {
        success: true,
        msg: "platform category mapping retrieved",
        data: found.into_iter().collect(),
    }))
}
