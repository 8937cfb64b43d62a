use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use service::statistics_service;

use crate::auth::{members_only, with_auth};
use crate::errors::ApiError;
use crate::response;
use crate::state::ServerState;

pub fn router(state: &ServerState) -> Router<ServerState> {
    with_auth(members_only(Router::new().route("/users", get(users))), state)
}

#[utoipa::path(get, path = "/user-management/statistics/users", tag = "statistics", responses((status = 200, description = "User statistics")))]
pub async fn users(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let stats = statistics_service::user_statistics(&state.db).await?;
    Ok(response::ok("User statistics retrieved successfully", stats))
}
