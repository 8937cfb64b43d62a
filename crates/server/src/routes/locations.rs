use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Extension, Router};
use serde::Deserialize;

use service::location_service::{self, AddressesInput, LocationExportInput};
use service::pagination::{PageQuery, Pagination};
use service::validation::{parse_id, parse_opt_id};

use crate::auth::{audit_context, managers_only, members_only, with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub organization_id: Option<String>,
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
            .route("/my", get(mine))
            .route("/export-csv", post(export_csv))
            .route("/:id", get(get_one))
            .route("/:id/activity", get(activity)),
    );
    with_auth(managers.merge(readers), state)
}

#[utoipa::path(post, path = "/user-management/locations", tag = "locations", responses((status = 201, description = "Locations created"), (status = 400, description = "Addresses are required"), (status = 422, description = "Address validation failed")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<AddressesInput>,
) -> Result<Response, ApiError> {
    let ctx = audit_context(&user, &headers);
    let created = location_service::create(&state.db, &ctx, input).await?;
    let message = format!("{} locations created successfully", created.len());
    Ok(response::created(&message, created))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<AddressesInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Location")?;
    let ctx = audit_context(&user, &headers);
    let updated = location_service::update(&state.db, &ctx, id, input).await?;
    Ok(response::ok("Location updated successfully", updated))
}

pub async fn remove(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Location")?;
    let ctx = audit_context(&user, &headers);
    location_service::delete(&state.db, &ctx, id).await?;
    Ok(response::ok("Location deleted successfully", serde_json::json!({ "id": id })))
}

pub async fn export_csv(State(state): State<ServerState>, ApiJson(input): ApiJson<LocationExportInput>) -> Result<Response, ApiError> {
    let body = location_service::export_csv(&state.db, &input).await?;
    Ok(response::csv("locations", body))
}

pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<LocationQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&PageQuery { page: q.page, page_size: q.page_size, search_string: q.search_string })?;
    let organization_id = parse_opt_id(q.organization_id.as_deref(), "Organization")?;
    let result = location_service::list(&state.db, &page, organization_id).await?;
    Ok(response::ok("Locations retrieved successfully", result))
}

pub async fn all(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let locations = location_service::list_all(&state.db).await?;
    Ok(response::ok("Locations retrieved successfully", locations))
}

pub async fn mine(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>) -> Result<Response, ApiError> {
    let locations = location_service::list_mine(&state.db, user.id).await?;
    Ok(response::ok("Locations retrieved successfully", locations))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Location")?;
    let location = location_service::get(&state.db, id).await?;
    Ok(response::ok("Location retrieved successfully", location))
}

pub async fn activity(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Location")?;
    let entries = location_service::activity(&state.db, id).await?;
    Ok(response::ok("Location activity retrieved successfully", entries))
}
