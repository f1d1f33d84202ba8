//! User stuff items: index queue, needs invalidation and mapping rewrites.

use super::crud::{self, Entity};
use super::{ApiResult, AppState};
use crate::config::Collections;
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use catalog_hub_core::mapping::{self, MappingRewrite};
use catalog_hub_core::queue::{claim_pending, invalidate_by_category, ClaimSpec};
use catalog_hub_core::storage::Document;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

pub const PATH: &str = "/stuff";

pub struct Stuff;

impl Entity for Stuff {
    const PATH: &'static str = PATH;

    fn collection(collections: &Collections) -> &str {
        &collections.stuff
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(crud::create::<Stuff>))
        .route("/pending-index", get(pending_index))
        .route("/needs/{category}", patch(needs))
        .route("/mapping/category", patch(rewrite_category))
        .route("/{key}", get(crud::detail::<Stuff>).patch(crud::update::<Stuff>))
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub result: &'static str,
    pub msg: &'static str,
    pub data: Map<String, Value>,
    pub stuff: Vec<Document>,
}

async fn pending_index(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    let claimed = claim_pending(
        state.store.as_ref(),
        &state.collections.stuff,
        ClaimSpec::STUFF_INDEX,
        state.limits.pending_index,
    )
    .await?;
    Ok(Json(claimed))
}

async fn needs(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<BatchResponse>> {
    let stuff =
        invalidate_by_category(state.store.as_ref(), &state.collections.stuff, &category).await?;
    Ok(Json(BatchResponse {
        result: "success",
        msg: "satisifies are changed.",
        data: body,
        stuff,
    }))
}

async fn rewrite_category(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<BatchResponse>> {
    let rewrite: MappingRewrite = mapping::parse_body(&body)?;
    let stuff =
        mapping::rewrite_mapping(state.store.as_ref(), &state.collections.stuff, &rewrite).await?;
    info!(rewritten = stuff.len(), "stuff categories changed");
    Ok(Json(BatchResponse {
        result: "success",
        msg: "categories are changed.",
        data: body,
        stuff,
    }))
}
