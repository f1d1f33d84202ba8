//! HTTP API layer: per-entity CRUD plus the hierarchy, mapping and queue
//! operations.

pub mod categories;
pub mod crud;
pub mod personas;
pub mod platform_categories;
pub mod platform_properties;
pub mod properties;
pub mod stuff;
pub mod users;

use crate::config::{Collections, Config, Limits};
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use catalog_hub_core::hierarchy::HierarchyConfig;
use catalog_hub_core::storage::DocumentStore;
use catalog_hub_core::Error;
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub collections: Arc<Collections>,
    pub hierarchy: Arc<HierarchyConfig>,
    pub limits: Limits,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self {
            store,
            collections: Arc::new(config.collections.clone()),
            hierarchy: Arc::new(config.hierarchy.clone()),
            limits: config.limits,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

/// Core errors rendered as HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::PRECONDITION_FAILED,
            Error::DuplicateKey { .. } => StatusCode::CONFLICT,
            Error::InvalidKey(_) | Error::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Error::CycleDetected { .. } | Error::DepthExceeded { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Malformed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.code();
        if status.is_server_error() {
            error!(code, error = %self.0, "request failed");
        } else {
            warn!(code, error = %self.0, "request rejected");
        }
        let missing = match &self.0 {
            Error::ValidationFailed { missing, .. } => missing.clone(),
            _ => Vec::new(),
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: code.to_string(),
            missing,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Revision from an `If-Match` header, with surrounding quotes stripped.
pub fn if_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().trim_start_matches("W/").trim_matches('"').to_string())
        .filter(|v| !v.is_empty() && v != "*")
}

/// Build the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest(categories::PATH, categories::routes())
        .nest(platform_categories::PATH, platform_categories::routes())
        .nest(personas::PATH, personas::routes())
        .nest(properties::PATH, properties::routes())
        .nest(platform_properties::PATH, platform_properties::routes())
        .nest(stuff::PATH, stuff::routes())
        .nest(users::PATH, users::routes())
        .route("/health", get(|| async { "OK" }))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

async fn request_id_middleware(mut req: axum::extract::Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        });
    req.headers_mut().insert(REQUEST_ID_HEADER, request_id.clone());

    let mut response = next.run(req).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_match_strips_quotes() {
        let mut headers = HeaderMap::new();
        assert_eq!(if_match(&headers), None);
        headers.insert(header::IF_MATCH, HeaderValue::from_static("\"abc\""));
        assert_eq!(if_match(&headers).as_deref(), Some("abc"));
        headers.insert(header::IF_MATCH, HeaderValue::from_static("W/\"abc\""));
        assert_eq!(if_match(&headers).as_deref(), Some("abc"));
        headers.insert(header::IF_MATCH, HeaderValue::from_static("*"));
        assert_eq!(if_match(&headers), None);
    }

    #[test]
    fn errors_map_to_distinct_statuses() {
        let cases = [
            (Error::not_found("c", "k"), StatusCode::NOT_FOUND),
            (
                Error::Conflict {
                    collection: "c".into(),
                    key: "k".into(),
                    expected: "1".into(),
                    actual: "2".into(),
                },
                StatusCode::PRECONDITION_FAILED,
            ),
            (Error::duplicate_key("c", "k"), StatusCode::CONFLICT),
            (Error::missing_fields("x", vec!["source".into()]), StatusCode::BAD_REQUEST),
            (Error::DepthExceeded { max_depth: 3 }, StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
