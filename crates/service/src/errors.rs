use sea_orm::{DbErr, SqlErr};
use serde_json::Value;
use thiserror::Error;

use crate::auth::errors::AuthError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { message: String, details: Option<Value> },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), details: None }
    }

    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        Self::Validation { message: message.into(), details: Some(details) }
    }

    pub fn bad_request(message: impl Into<String>) -> Self { Self::BadRequest(message.into()) }

    pub fn conflict(message: impl Into<String>) -> Self { Self::Conflict(message.into()) }
}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict("Resource already exists".into()),
            _ => ServiceError::Db(e.to_string()),
        }
    }
}

impl From<models::errors::ModelError> for ServiceError {
    fn from(e: models::errors::ModelError) -> Self {
        use models::errors::ModelError;
        match e {
            ModelError::Validation(m) => ServiceError::validation(m),
            ModelError::NotFound(entity) => ServiceError::not_found(&capitalize(&entity)),
            ModelError::Db(m) => ServiceError::Db(m),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::Validation(m) => ServiceError::validation(m),
            AuthError::EmailNotFound => ServiceError::NotFound(message),
            AuthError::PasswordNotSet
            | AuthError::InvalidCredentials
            | AuthError::Inactive
            | AuthError::TokenMissing
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::TokenImmature
            | AuthError::UserNotFound => ServiceError::Unauthorized(message),
            AuthError::HashError(_) | AuthError::TokenError(_) => ServiceError::Internal(message),
            AuthError::Repository(m) => ServiceError::Db(m),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ModelError;

    #[test]
    fn model_not_found_reads_like_a_sentence() {
        let e: ServiceError = ModelError::NotFound("organization".into()).into();
        assert_eq!(e.to_string(), "Organization not found");
    }

    #[test]
    fn auth_errors_keep_their_messages() {
        let e: ServiceError = AuthError::InvalidCredentials.into();
        assert!(matches!(e, ServiceError::Unauthorized(ref m) if m == "Login Credentials Invalid"));
        let e: ServiceError = AuthError::EmailNotFound.into();
        assert!(matches!(e, ServiceError::NotFound(_)));
    }
}
