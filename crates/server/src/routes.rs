use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;

use crate::errors::ApiError;
use crate::observability;
use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub mod auth;
pub mod departments;
pub mod groups;
pub mod locations;
pub mod organizations;
pub mod projects;
pub mod roles;
pub mod statistics;
pub mod tasks;
pub mod users;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn root(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "API Server is running!",
        "timestamp": Utc::now().to_rfc3339(),
        "version": state.config.app.api_version,
    }))
}

async fn openapi_json() -> Response {
    Json(ApiDoc::openapi()).into_response()
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} not found", uri.path()))
}

/// Any origin is mirrored back so credentialed requests (the auth cookie) work.
pub fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Build the full application router: health, docs, metrics and every resource under the API prefix.
pub fn build_router(state: ServerState) -> Router {
    let prefix = state.config.api_prefix();
    let um = format!("{}/user-management", prefix);

    let api = Router::new()
        .nest(&format!("{}/auth", prefix), auth::router(&state))
        .nest(&format!("{}/organizations", um), organizations::router(&state))
        .nest(&format!("{}/departments", um), departments::router(&state))
        .nest(&format!("{}/groups", um), groups::router(&state))
        .nest(&format!("{}/locations", um), locations::router(&state))
        .nest(&format!("{}/roles", um), roles::router(&state))
        .nest(&format!("{}/users", um), users::router(&state))
        .nest(&format!("{}/statistics", um), statistics::router(&state))
        .nest(&format!("{}/projects", prefix), projects::router(&state))
        .nest(&format!("{}/tasks", prefix), tasks::router(&state));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(observability::metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(api)
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(observability::track_metrics))
        .layer(build_cors())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

/// Shared by handlers that answer with a bare status (logout).
pub fn no_content() -> Response {
    let mut resp = StatusCode::NO_CONTENT.into_response();
    resp.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    resp
}
