use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Extension, Router};
use serde::Deserialize;

use service::pagination::{PageQuery, Pagination};
use service::user_service::{self, UserFilterInput, UserInput};
use service::validation::parse_id;

use crate::auth::{admin_only, audit_context, members_only, with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub organization_id: Option<String>,
    pub department_id: Option<String>,
    pub role_id: Option<String>,
    pub status: Option<String>,
}

pub fn router(state: &ServerState) -> Router<ServerState> {
    let admin = admin_only(
        Router::new()
            .route("/", post(create))
            .route("/export-csv", post(export_csv))
            .route("/:id", patch(update).delete(remove))
            .route("/:id/reset-password", patch(reset_password)),
    );
    let readers = members_only(
        Router::new()
            .route("/", get(list))
            .route("/my", get(me))
            .route("/all", get(all))
            .route("/organization/:organization_id", get(by_organization))
            .route("/department/:department_id", get(by_department))
            .route("/role/:role_id", get(by_role))
            .route("/:id", get(get_one)),
    );
    with_auth(admin.merge(readers), state)
}

pub async fn me(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>) -> Result<Response, ApiError> {
    let profile = user_service::get(&state.db, user.id).await?;
    Ok(response::ok("User profile retrieved successfully", profile))
}

#[utoipa::path(post, path = "/user-management/users", tag = "users", responses((status = 201, description = "User created successfully"), (status = 409, description = "Email already exists"), (status = 422, description = "Validation error")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<UserInput>,
) -> Result<Response, ApiError> {
    let ctx = audit_context(&user, &headers);
    let created = user_service::create(&state.db, &ctx, input).await?;
    Ok(response::created("User created successfully", created))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UserInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    let ctx = audit_context(&user, &headers);
    let updated = user_service::update(&state.db, &ctx, id, input).await?;
    Ok(response::ok("User updated successfully", updated))
}

pub async fn reset_password(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    let reset = user_service::reset_password(&state.db, id).await?;
    Ok(response::ok("Password reset successfully", reset))
}

pub async fn remove(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    let ctx = audit_context(&user, &headers);
    let deleted = user_service::delete(&state.db, &ctx, id).await?;
    Ok(response::ok("User deleted successfully", serde_json::json!({ "id": deleted })))
}

#[utoipa::path(get, path = "/user-management/users", tag = "users", responses((status = 200, description = "Users retrieved successfully")))]
pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<UserQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string.clone() })?;
    let filter = UserFilterInput {
        search_string: q.search_string,
        organization_id: q.organization_id,
        department_id: q.department_id,
        role_id: q.role_id,
        status: q.status,
    };
    let result = user_service::list(&state.db, &page, &filter).await?;
    Ok(response::ok("Users retrieved successfully", result))
}

pub async fn all(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let users = user_service::list_all(&state.db).await?;
    Ok(response::ok("Users retrieved successfully", users))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    let user = user_service::get(&state.db, id).await?;
    Ok(response::ok("User retrieved successfully", user))
}

pub async fn by_organization(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Organization")?;
    let users = user_service::list_by_organization(&state.db, id).await?;
    Ok(response::ok("Users retrieved successfully", users))
}

pub async fn by_department(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Department")?;
    let users = user_service::list_by_department(&state.db, id).await?;
    Ok(response::ok("Users retrieved successfully", users))
}

pub async fn by_role(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Role")?;
    let users = user_service::list_by_role(&state.db, id).await?;
    Ok(response::ok("Users retrieved successfully", users))
}

pub async fn export_csv(State(state): State<ServerState>, ApiJson(input): ApiJson<UserFilterInput>) -> Result<Response, ApiError> {
    let body = user_service::export_csv(&state.db, &input).await?;
    Ok(response::csv("users", body))
}
