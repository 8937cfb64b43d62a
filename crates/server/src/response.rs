//! Success envelopes and CSV attachments.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use common::types::ApiResponse;
use common::utils::csv::{csv_filename, CONTENT_TYPE};

fn envelope<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> Response {
    info!(status = status.as_u16(), msg = message, "request succeeded");
    (status, Json(ApiResponse::new(status.as_u16(), message, data))).into_response()
}

pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
    envelope(StatusCode::OK, message, Some(data))
}

pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    envelope(StatusCode::CREATED, message, Some(data))
}

/// Envelope without a `data` field.
pub fn message(status: StatusCode, message: &str) -> Response {
    envelope::<()>(status, message, None)
}

/// CSV attachment named `<name>_<timestamp>.csv`.
pub fn csv(name: &str, body: String) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", csv_filename(name, Utc::now()));
    let mut resp = (StatusCode::OK, body).into_response();
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
    if let Ok(v) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    info!(file = name, "csv exported");
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_response_headers() {
        let resp = csv("groups", "Name\nOps".into());
        let h = resp.headers();
        assert_eq!(h[header::CONTENT_TYPE], CONTENT_TYPE);
        assert_eq!(h[header::PRAGMA], "no-cache");
        let disposition = h[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"groups_"));
        assert!(disposition.ends_with(".csv\""));
    }

    #[test]
    fn created_status() {
        assert_eq!(created("Task added successfully", 1).status(), StatusCode::CREATED);
        assert_eq!(message(StatusCode::OK, "Project deleted successfully").status(), StatusCode::OK);
    }
}
