use super::crud::{self, Entity};
use super::{ApiResult, AppState};
use crate::config::Collections;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use catalog_hub_core::relations;
use catalog_hub_core::storage::Document;

pub const PATH: &str = "/users";

pub struct Users;

impl Entity for Users {
    const PATH: &'static str = PATH;

    fn collection(collections: &Collections) -> &str {
        &collections.users
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(crud::create::<Users>))
        .route("/connections/{from_user}", get(connections))
        .route(
            "/{key}",
            get(crud::detail::<Users>)
                .post(crud::upsert_key::<Users>)
                .patch(crud::update::<Users>),
        )
}

/// Users one edge away from `from_user`, tagged with the edge name.
async fn connections(
    State(state): State<AppState>,
    Path(from_user): Path<String>,
) -> ApiResult<Json<Vec<Document>>> {
    let connected = relations::connections(
        state.store.as_ref(),
        &state.collections.users,
        &state.collections.user_relations,
        &from_user,
        state.limits.connections,
    )
    .await?;
    Ok(Json(connected))
}
