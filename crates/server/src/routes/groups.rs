use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Extension, Router};
use serde::Deserialize;

use service::group_service::{self, GroupInput, MemberFilter};
use service::pagination::{PageQuery, Pagination};
use service::validation::{filter_id, parse_id, parse_opt_id};

use crate::auth::{audit_context, managers_only, members_only, with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub department: Option<String>,
    /// `true` or `false`; anything else means no filter.
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupExportInput {
    pub search_string: Option<String>,
    pub department: Option<String>,
}

pub fn router(state: &ServerState) -> Router<ServerState> {
    let managers = managers_only(
        Router::new()
            .route("/", post(create))
            .route("/:id", patch(update).delete(remove)),
    );
    let readers = members_only(
        Router::new()
            .route("/", get(list))
            .route("/all", get(all))
            .route("/export-csv", post(export_csv))
            .route("/:id", get(get_one))
            .route("/:id/members", get(members))
            .route("/:id/activity", get(activity)),
    );
    with_auth(managers.merge(readers), state)
}

#[utoipa::path(post, path = "/user-management/groups", tag = "groups", responses((status = 201, description = "Group created successfully"), (status = 409, description = "Group name already exists"), (status = 422, description = "Validation error")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<GroupInput>,
) -> Result<Response, ApiError> {
    let ctx = audit_context(&user, &headers);
    let created = group_service::create(&state.db, &ctx, input).await?;
    Ok(response::created("Group created successfully", created))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<GroupInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Group")?;
    let ctx = audit_context(&user, &headers);
    let updated = group_service::update(&state.db, &ctx, id, input).await?;
    Ok(response::ok("Group updated successfully", updated))
}

pub async fn remove(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Group")?;
    let ctx = audit_context(&user, &headers);
    group_service::delete(&state.db, &ctx, id).await?;
    Ok(response::ok("Group deleted successfully", serde_json::json!({ "id": id })))
}

pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<GroupQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string })?;
    let department = parse_opt_id(q.department.as_deref(), "Department")?;
    let result = group_service::list(&state.db, &page, department).await?;
    Ok(response::ok("Groups retrieved successfully", result))
}

pub async fn all(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let groups = group_service::list_all(&state.db).await?;
    Ok(response::ok("Groups retrieved successfully", groups))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Group")?;
    let group = group_service::get(&state.db, id).await?;
    Ok(response::ok("Group retrieved successfully", group))
}

pub async fn members(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiQuery(q): ApiQuery<MemberQuery>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Group")?;
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string })?;
    let filter = MemberFilter {
        department_id: filter_id(q.department.as_deref()),
        active: match q.status.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        },
    };
    let result = group_service::members(&state.db, id, &page, &filter).await?;
    Ok(response::ok("Group members retrieved successfully", result))
}

pub async fn activity(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Group")?;
    let entries = group_service::activity(&state.db, id).await?;
    Ok(response::ok("Group activity retrieved successfully", entries))
}

pub async fn export_csv(State(state): State<ServerState>, ApiJson(input): ApiJson<GroupExportInput>) -> Result<Response, ApiError> {
    let body = group_service::export_csv(&state.db, input.search_string.as_deref(), input.department.as_deref()).await?;
    Ok(response::csv("groups", body))
}
