use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Extension, Router};
use serde::Deserialize;

use service::pagination::{PageQuery, Pagination};
use service::role_service::{self, RoleExportInput, RoleInput};
use service::validation::parse_id;

use crate::auth::{with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub permission_section: Option<String>,
}

pub fn router(state: &ServerState) -> Router<ServerState> {
    let public = Router::new().route("/", get(list)).route("/:id", get(get_one));
    let signed_in = Router::new()
        .route("/", post(create))
        .route("/all", get(all))
        .route("/export-csv", post(export_csv))
        .route("/:id", patch(update).delete(remove));
    public.merge(with_auth(signed_in, state))
}

#[utoipa::path(post, path = "/user-management/roles", tag = "roles", responses((status = 201, description = "Role created successfully"), (status = 400, description = "Role with this name already exists"), (status = 422, description = "Validation error")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<RoleInput>,
) -> Result<Response, ApiError> {
    let created = role_service::create(&state.db, user.id, input).await?;
    Ok(response::created("Role created successfully", created))
}

pub async fn update(State(state): State<ServerState>, Path(id): Path<String>, ApiJson(input): ApiJson<RoleInput>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Role")?;
    let updated = role_service::update(&state.db, id, input).await?;
    Ok(response::ok("Role updated successfully", updated))
}

pub async fn remove(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Role")?;
    role_service::delete(&state.db, id).await?;
    Ok(response::ok("Role deleted successfully", serde_json::json!({ "id": id })))
}

pub async fn export_csv(State(state): State<ServerState>, ApiJson(input): ApiJson<RoleExportInput>) -> Result<Response, ApiError> {
    let body = role_service::export_csv(&state.db, &input).await?;
    Ok(response::csv("roles", body))
}

pub async fn all(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let roles = role_service::list_all(&state.db).await?;
    Ok(response::ok("Roles retrieved successfully", roles))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Role")?;
    let role = role_service::get(&state.db, id).await?;
    Ok(response::ok("Role retrieved successfully", role))
}

#[utoipa::path(get, path = "/user-management/roles", tag = "roles", responses((status = 200, description = "Roles retrieved successfully"), (status = 400, description = "Invalid permission section")))]
pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<RoleQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string })?;
    let result = role_service::list(&state.db, &page, q.permission_section.as_deref()).await?;
    Ok(response::ok("Roles retrieved successfully", result))
}
