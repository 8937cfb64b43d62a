use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Extension, Router};
use serde::Deserialize;

use service::pagination::{PageQuery, Pagination};
use service::project_service::{self, ProjectInput};
use service::user_service::parse_status;
use service::validation::parse_id;

use crate::auth::{managers_only, members_only, with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    /// `active` or `inactive`
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub active: bool,
}

pub fn router(state: &ServerState) -> Router<ServerState> {
    let managers = managers_only(
        Router::new()
            .route("/", post(create))
            .route("/:id", patch(update).delete(remove))
            .route("/:id/status", patch(set_status)),
    );
    let readers = members_only(Router::new().route("/", get(list)).route("/:id", get(get_one)));
    with_auth(managers.merge(readers), state)
}

#[utoipa::path(post, path = "/projects", tag = "projects", responses((status = 201, description = "Project created successfully"), (status = 409, description = "Duplicate slug or code"), (status = 422, description = "Validation error")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ProjectInput>,
) -> Result<Response, ApiError> {
    let created = project_service::create(&state.db, user.id, input).await?;
    Ok(response::created("Project created successfully", created))
}

#[utoipa::path(get, path = "/projects", tag = "projects", responses((status = 200, description = "Projects retrieved successfully")))]
pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<ProjectQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string })?;
    let active = parse_status(q.status.as_deref())?;
    let result = project_service::list(&state.db, &page, active).await?;
    Ok(response::ok("Projects retrieved successfully", result))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Project")?;
    let project = project_service::get(&state.db, id).await?;
    Ok(response::ok("Project retrieved successfully", project))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ProjectInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Project")?;
    let updated = project_service::update(&state.db, user.id, id, input).await?;
    Ok(response::ok("Project updated successfully", updated))
}

pub async fn set_status(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<StatusInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Project")?;
    let (project, message) = project_service::set_status(&state.db, user.id, id, input.active).await?;
    Ok(response::ok(&message, project))
}

pub async fn remove(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Project")?;
    project_service::delete(&state.db, id).await?;
    Ok(response::ok("Project deleted successfully", serde_json::json!({ "id": id })))
}
