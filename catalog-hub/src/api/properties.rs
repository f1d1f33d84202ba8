//! Standard property definitions.

use super::crud::{self, Entity};
use super::AppState;
use crate::config::Collections;
use axum::{routing::get, Router};

pub const PATH: &str = "/properties";

pub struct Properties;

impl Entity for Properties {
    const PATH: &'static str = PATH;

    fn collection(collections: &Collections) -> &str {
        &collections.properties
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(crud::list::<Properties>).post(crud::create::<Properties>))
        .route(
            "/{key}",
            get(crud::detail::<Properties>)
                .put(crud::replace::<Properties>)
                .patch(crud::update::<Properties>),
        )
}
