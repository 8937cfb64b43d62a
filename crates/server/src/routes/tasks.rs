use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{delete, get, patch, post};
use axum::{Extension, Router};
use serde::Deserialize;
use serde_json::json;

use service::pagination::{PageQuery, Pagination};
use service::task_service::{self, TaskFilter, TaskInput};
use service::validation::{parse_id, parse_opt_id};

use crate::auth::{managers_only, members_only, with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneesInput {
    #[serde(default)]
    pub user_ids: Vec<String>,
}

pub fn router(state: &ServerState) -> Router<ServerState> {
    let managers = managers_only(
        Router::new()
            .route("/", post(create))
            .route("/mark-overdue", post(mark_overdue))
            .route("/:id", patch(update).delete(archive))
            .route("/:id/restore", patch(restore))
            .route("/:id/assignees", post(add_assignees))
            .route("/:id/assignees/:user_id", delete(remove_assignee)),
    );
    let readers = members_only(
        Router::new()
            .route("/", get(list))
            .route("/stats", get(stats))
            .route("/archived", get(archived))
            .route("/:id", get(get_one))
            .route("/:id/status", patch(update_status)),
    );
    with_auth(managers.merge(readers), state)
}

#[utoipa::path(post, path = "/tasks", tag = "tasks", responses((status = 201, description = "Task added successfully"), (status = 404, description = "Project not found"), (status = 422, description = "Validation error")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<TaskInput>,
) -> Result<Response, ApiError> {
    let created = task_service::create(&state.db, user.id, input).await?;
    Ok(response::created("Task added successfully", created))
}

#[utoipa::path(get, path = "/tasks", tag = "tasks", responses((status = 200, description = "Tasks retrieved successfully")))]
pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<TaskQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string })?;
    let filter = TaskFilter::parse(q.project_id.as_deref(), q.status.as_deref(), q.priority.as_deref(), q.assignee_id.as_deref())?;
    let result = task_service::list(&state.db, &page, &filter).await?;
    Ok(response::ok("Tasks retrieved successfully", result))
}

pub async fn stats(State(state): State<ServerState>, ApiQuery(q): ApiQuery<StatsQuery>) -> Result<Response, ApiError> {
    let project_id = parse_opt_id(q.project_id.as_deref(), "Project")?;
    let counts = task_service::stats(&state.db, project_id).await?;
    Ok(response::ok("Task statistics retrieved successfully", counts))
}

pub async fn mark_overdue(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let count = task_service::mark_overdue(&state.db).await?;
    let message = if count == 0 {
        "No overdue tasks to update".to_string()
    } else {
        format!("{} tasks marked as overdue", count)
    };
    Ok(response::ok(&message, json!({ "count": count })))
}

pub async fn archived(State(state): State<ServerState>, ApiQuery(q): ApiQuery<PageQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&q)?;
    let result = task_service::list_archived(&state.db, &page).await?;
    Ok(response::ok("Archived tasks retrieved successfully", result))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Task")?;
    let task = task_service::get(&state.db, id).await?;
    Ok(response::ok("Task retrieved successfully", task))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<TaskInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Task")?;
    let updated = task_service::update(&state.db, user.id, id, input).await?;
    Ok(response::ok("Task updated successfully", updated))
}

pub async fn update_status(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<StatusInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Task")?;
    let updated = task_service::update_status(&state.db, user.id, id, &input.status).await?;
    Ok(response::ok("Task status updated successfully", updated))
}

pub async fn archive(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Task")?;
    task_service::archive(&state.db, id).await?;
    Ok(response::ok("Task archived successfully", json!({ "id": id })))
}

pub async fn restore(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Task")?;
    let task = task_service::restore(&state.db, id).await?;
    Ok(response::ok("Task has been restored successfully", task))
}

pub async fn add_assignees(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<AssigneesInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Task")?;
    let task = task_service::add_assignees(&state.db, id, &input.user_ids).await?;
    Ok(response::ok("Task assignees added successfully", task))
}

pub async fn remove_assignee(State(state): State<ServerState>, Path((id, user_id)): Path<(String, String)>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Task")?;
    let user_id = parse_id(&user_id, "User")?;
    task_service::remove_assignee(&state.db, id, user_id).await?;
    Ok(response::ok("Task assignment removed successfully", json!({ "taskId": id, "userId": user_id })))
}
