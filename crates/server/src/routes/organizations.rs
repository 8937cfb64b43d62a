use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Extension, Router};

use service::organization_service::{self, OrganizationInput};
use service::pagination::{PageQuery, Pagination};
use service::validation::parse_id;

use crate::auth::{managers_only, with_auth, CurrentUser};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response;
use crate::state::ServerState;

pub fn router(state: &ServerState) -> Router<ServerState> {
    let public = Router::new().route("/", get(list)).route("/:id", get(get_one));
    let managers = managers_only(
        Router::new()
            .route("/", post(create))
            .route("/:id", patch(update).delete(remove)),
    );
    let signed_in = Router::new().route("/my", get(mine)).route("/all", get(all)).merge(managers);
    public.merge(with_auth(signed_in, state))
}

#[utoipa::path(post, path = "/user-management/organizations", tag = "organizations", responses((status = 201, description = "Organization created successfully"), (status = 400, description = "Bad Request")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<OrganizationInput>,
) -> Result<Response, ApiError> {
    let created = organization_service::create(&state.db, user.id, input).await?;
    Ok(response::created("Organization created successfully", created))
}

pub async fn mine(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>) -> Result<Response, ApiError> {
    let orgs = organization_service::list_mine(&state.db, user.id).await?;
    Ok(response::ok("Organizations retrieved successfully", orgs))
}

pub async fn all(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let orgs = organization_service::list_all(&state.db).await?;
    Ok(response::ok("Organizations retrieved successfully", orgs))
}

#[utoipa::path(get, path = "/user-management/organizations/{id}", tag = "organizations", params(("id" = String, Path, description = "Organization id")), responses((status = 200, description = "Organization retrieved successfully"), (status = 404, description = "Organization not found")))]
pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Organization")?;
    let org = organization_service::get(&state.db, id).await?;
    Ok(response::ok("Organization retrieved successfully", org))
}

#[utoipa::path(get, path = "/user-management/organizations", tag = "organizations", responses((status = 200, description = "Organizations retrieved successfully")))]
pub async fn list(State(state): State<ServerState>, ApiQuery(q): ApiQuery<PageQuery>) -> Result<Response, ApiError> {
    let page = Pagination::from_query(&q)?;
    let result = organization_service::list(&state.db, &page).await?;
    Ok(response::ok("Organizations retrieved successfully", result))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<OrganizationInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Organization")?;
    let updated = organization_service::update(&state.db, id, input).await?;
    Ok(response::ok("Organization updated successfully", updated))
}

pub async fn remove(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Organization")?;
    organization_service::delete(&state.db, id).await?;
    Ok(response::ok("Organization deleted successfully", serde_json::json!({ "id": id })))
}
