//! Platform-specific properties and their sync queue.

use super::crud::{self, Entity};
use super::platform_categories::LookupResponse;
use super::{ApiResult, AppState};
use crate::config::Collections;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use catalog_hub_core::mapping::{self, PropertyMappingQuery};
use catalog_hub_core::queue::{claim_pending, ClaimSpec};
use catalog_hub_core::storage::Document;
use catalog_hub_core::upsert::UpsertByKey;
use serde_json::{Map, Value};

pub const PATH: &str = "/platform-properties";

pub struct PlatformProperties;

impl Entity for PlatformProperties {
    const PATH: &'static str = PATH;

    fn collection(collections: &Collections) -> &str {
        &collections.platform_properties
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(crud::upsert_body::<PlatformProperties>))
        .route("/pending-sync", get(pending_sync))
        .route("/append", post(append))
        .route("/get-mapping", post(get_mapping))
        .route(
            "/{key}",
            get(crud::detail::<PlatformProperties>).patch(crud::update::<PlatformProperties>),
        )
}

/// Claim the next batch of mapped properties awaiting sync.
async fn pending_sync(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    let claimed = claim_pending(
        state.store.as_ref(),
        &state.collections.platform_properties,
        ClaimSpec::PROPERTY_SYNC,
        state.limits.pending_sync,
    )
    .await?;
    Ok(Json(claimed))
}

/// Store a property unless one already exists under its key.
async fn append(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<Document>> {
    let key = crud::body_key(&body)?;
    let doc = UpsertByKey::new(state.store.as_ref(), &state.collections.platform_properties)
        .keep_existing()
        .run(&key, body)
        .await?;
    Ok(Json(doc))
}

async fn get_mapping(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<LookupResponse>> {
    let query: PropertyMappingQuery = mapping::parse_body(&body)?;
    let found = mapping::lookup_property_mapping(
        state.store.as_ref(),
        &state.collections.platform_properties,
        &query,
    )
    .await?;
    Ok(Json(LookupResponse {
        success: true,
        msg: "platform property mapping retrieved",
        data: found,
    }))
}
