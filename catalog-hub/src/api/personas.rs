use super::crud::{self, Entity};
use super::AppState;
use crate::config::Collections;
use axum::{routing::get, Router};

pub const PATH: &str = "/personas";

pub struct Personas;

impl Entity for Personas {
    const PATH: &'static str = PATH;

    fn collection(collections: &Collections) -> &str {
        &collections.personas
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(crud::list::<Personas>)).route(
        "/{key}",
        get(crud::detail::<Personas>)
            .post(crud::upsert_key::<Personas>)
            .patch(crud::update::<Personas>),
    )
}
