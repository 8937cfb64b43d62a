use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(ToSchema)]
pub struct PaginationInfoDoc {
    pub total_records: u64,
    pub total_pages: u64,
    pub page_size: u64,
    pub current_page: u64,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
}

/// Paths are relative to the configured API prefix (default `/api/v1`), except `/health`.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::organizations::create,
        crate::routes::organizations::list,
        crate::routes::organizations::get_one,
        crate::routes::departments::list,
        crate::routes::departments::get_one,
        crate::routes::groups::create,
        crate::routes::locations::create,
        crate::routes::roles::create,
        crate::routes::roles::list,
        crate::routes::users::create,
        crate::routes::users::list,
        crate::routes::statistics::users,
        crate::routes::projects::create,
        crate::routes::projects::list,
        crate::routes::tasks::create,
        crate::routes::tasks::list,
    ),
    components(schemas(HealthResponse, LoginRequest, ErrorResponse, PaginationInfoDoc)),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "organizations"),
        (name = "departments"),
        (name = "groups"),
        (name = "locations"),
        (name = "roles"),
        (name = "users"),
        (name = "statistics"),
        (name = "projects"),
        (name = "tasks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_resource_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/auth/login"));
        assert!(doc.paths.paths.contains_key("/tasks"));
        assert!(doc.paths.paths.contains_key("/user-management/organizations/{id}"));
    }
}
