use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use common::types::ErrorBody;
use service::auth::errors::AuthError;
use service::errors::ServiceError;

/// Every handler error funnels through here; `IntoResponse` renders the error envelope.
#[derive(Debug, Error)]
pub enum ApiError {
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
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation { message, details } => ApiError::Validation { message, details },
            ServiceError::BadRequest(m) => ApiError::BadRequest(m),
            ServiceError::NotFound(m) => ApiError::NotFound(m),
            ServiceError::Unauthorized(m) => ApiError::Unauthorized(m),
            ServiceError::Forbidden(m) => ApiError::Forbidden(m),
            ServiceError::Conflict(m) => ApiError::Conflict(m),
            ServiceError::Db(m) | ServiceError::Internal(m) => ApiError::Internal(m),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ServiceError::from(e).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let (message, details) = match self {
            ApiError::Validation { message, details } => (message, details),
            ApiError::Internal(detail) => {
                error!(status = status.as_u16(), error = %detail, "request failed");
                ("Internal Server Error".to_string(), None)
            }
            other => (other.to_string(), None),
        };
        if status.is_client_error() {
            warn!(status = status.as_u16(), kind, msg = %message, "request rejected");
        }
        let body = ErrorBody { success: false, message, kind: kind.to_string(), details };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_keep_their_status() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (ServiceError::bad_request("bad"), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (ServiceError::not_found("Task"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ServiceError::conflict("dup"), StatusCode::CONFLICT, "CONFLICT"),
            (ServiceError::Db("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
        ];
        for (err, status, kind) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.kind(), kind);
        }
    }

    #[test]
    fn auth_errors_map_to_unauthorized() {
        let api: ApiError = AuthError::TokenExpired.into();
        assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(api.to_string(), "Authorization Token Expired");
    }
}
