//! Standard category taxonomy.

use super::crud::{self, Entity};
use super::AppState;
use crate::config::Collections;
use axum::{routing::get, Router};

pub const PATH: &str = "/categories";

pub struct Categories;

impl Entity for Categories {
    const PATH: &'static str = PATH;

    fn collection(collections: &Collections) -> &str {
        &collections.categories
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(crud::list::<Categories>).post(crud::create::<Categories>))
        .route(
            "/{key}",
            get(crud::detail::<Categories>)
                .put(crud::replace::<Categories>)
                .patch(crud::update::<Categories>),
        )
}
