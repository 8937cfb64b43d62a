use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Extension, Router};
use serde::Deserialize;

use service::department_service::{self, DepartmentFilter, DepartmentInput};
use service::pagination::{PageQuery, Pagination};
use service::validation::{filter_id, parse_id};

use crate::auth::{with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub organization_id: Option<String>,
    pub department_id: Option<String>,
    pub status: Option<String>,
}

pub fn router(state: &ServerState) -> Router<ServerState> {
    let public = Router::new()
        .route("/", get(list))
        .route("/organization/:org_id", get(by_organization))
        .route("/:id", get(get_one));
    let signed_in = Router::new()
        .route("/", post(create))
        .route("/all", get(all))
        .route("/:id", patch(update).delete(remove));
    public.merge(with_auth(signed_in, state))
}

pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> Result<Response, ApiError> {
    let created = department_service::create(&state.db, user.id, input).await?;
    Ok(response::created("Department created successfully", created))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Department")?;
    let updated = department_service::update(&state.db, id, input).await?;
    Ok(response::ok("Department updated successfully", updated))
}

pub async fn remove(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Department")?;
    department_service::delete(&state.db, id).await?;
    Ok(response::ok("Department deleted successfully", serde_json::json!({ "id": id })))
}

pub async fn all(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let departments = department_service::list_all(&state.db).await?;
    Ok(response::ok("Departments retrieved successfully", departments))
}

pub async fn by_organization(
    State(state): State<ServerState>,
    Path(org_id): Path<String>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let org_id = parse_id(&org_id, "Organization")?;
    let page = Pagination::from_query(&q)?;
    let result = department_service::list_by_organization(&state.db, org_id, &page).await?;
    Ok(response::ok("Departments retrieved successfully", result))
}

#[utoipa::path(get, path = "/user-management/departments/{id}", tag = "departments", params(("id" = String, Path, description = "Department id")), responses((status = 200, description = "Department retrieved successfully"), (status = 404, description = "Department not found")))]
pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Department")?;
    let department = department_service::get(&state.db, id).await?;
    Ok(response::ok("Department retrieved successfully", department))
}

#[utoipa::path(get, path = "/user-management/departments", tag = "departments", responses((status = 200, description = "Departments retrieved successfully")))]
pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<DepartmentQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string })?;
    let filter = DepartmentFilter {
        organization_id: filter_id(q.organization_id.as_deref()),
        department_id: filter_id(q.department_id.as_deref()),
        status: q.status.filter(|s| !s.trim().is_empty()),
    };
    let result = department_service::list(&state.db, &page, &filter).await?;
    Ok(response::ok("Departments retrieved successfully", result))
}
