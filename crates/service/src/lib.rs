//! Service layer providing business-oriented operations on top of models.
//! - Separates business rules (validation, uniqueness, cascades) from data access.
//! - Reuses entity definitions and query helpers from the `models` crate.
//! - Returns `ServiceError`, which the HTTP layer maps to status codes.

pub mod errors;
pub mod auth;
pub mod pagination;
pub mod validation;
pub mod refs;
pub mod activity_service;
pub mod organization_service;
pub mod department_service;
pub mod group_service;
pub mod location_service;
pub mod role_service;
pub mod user_service;
pub mod statistics_service;
pub mod project_service;
pub mod task_service;
pub mod seed;
#[cfg(test)]
pub mod test_support;
