//! Bearer authentication and role guards.
//!
//! `require_auth` resolves the token (Authorization header first, then the auth cookie),
//! loads the live user and stores it as a [`CurrentUser`] request extension. The role
//! guards run after it and only read that extension.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use service::activity_service::AuditContext;
use service::auth::domain::AuthUser;
use service::auth::errors::AuthError;

use crate::errors::ApiError;
use crate::state::ServerState;

pub type CurrentUser = AuthUser;

pub const ADMIN: &[&str] = &["admin", "super_admin"];
pub const MANAGERS: &[&str] = &["admin", "super_admin", "hod", "user"];
pub const MEMBERS: &[&str] = &["user", "admin", "super_admin", "hod"];

/// Token from `Authorization: Bearer <t>`, falling back to the named cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
    }
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let path = req.uri().path().to_string();
    let Some(token) = extract_token(req.headers(), &state.config.auth.cookie_name) else {
        warn!(path = %path, "missing Authorization header and auth cookie");
        return Err(AuthError::TokenMissing.into());
    };
    match state.auth.authenticate(&token).await {
        Ok(user) => {
            debug!(path = %path, user_id = %user.id, "request authenticated");
            req.extensions_mut().insert::<CurrentUser>(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            warn!(path = %path, error = %e, "token validation failed");
            Err(e.into())
        }
    }
}

/// Role check against an allowed set; names compare case-insensitively.
pub fn check_role(user: Option<&CurrentUser>, allowed: &[&str]) -> Result<(), ApiError> {
    let user = user.ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
    let permitted = user
        .role
        .as_deref()
        .map(|r| allowed.iter().any(|a| a.eq_ignore_ascii_case(r)))
        .unwrap_or(false);
    if permitted {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = ?user.role, "role not permitted");
        Err(ApiError::Forbidden(format!("Access denied. Required roles: {}", allowed.join(", "))))
    }
}

async fn guard(allowed: &[&str], req: Request, next: Next) -> Result<Response, ApiError> {
    check_role(req.extensions().get::<CurrentUser>(), allowed)?;
    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    guard(ADMIN, req, next).await
}

pub async fn require_managers(req: Request, next: Next) -> Result<Response, ApiError> {
    guard(MANAGERS, req, next).await
}

pub async fn require_members(req: Request, next: Next) -> Result<Response, ApiError> {
    guard(MEMBERS, req, next).await
}

/// Require a valid token on every route of `router`.
pub fn with_auth(router: Router<ServerState>, state: &ServerState) -> Router<ServerState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

pub fn admin_only(router: Router<ServerState>) -> Router<ServerState> {
    router.route_layer(middleware::from_fn(require_admin))
}

pub fn managers_only(router: Router<ServerState>) -> Router<ServerState> {
    router.route_layer(middleware::from_fn(require_managers))
}

pub fn members_only(router: Router<ServerState>) -> Router<ServerState> {
    router.route_layer(middleware::from_fn(require_members))
}

/// Who did it and from where, for the activity log.
pub fn audit_context(user: &CurrentUser, headers: &HeaderMap) -> AuditContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    AuditContext { performed_by: Some(user.id), ip_address, user_agent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    fn user(role: Option<&str>) -> CurrentUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            active: true,
            role: role.map(String::from),
        }
    }

    #[test]
    fn header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("ATHID=xyz"));
        assert_eq!(extract_token(&headers, "ATHID").as_deref(), Some("abc"));
        headers.remove(header::AUTHORIZATION);
        assert_eq!(extract_token(&headers, "ATHID").as_deref(), Some("xyz"));
    }

    #[test]
    fn non_bearer_scheme_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_token(&headers, "ATHID").is_none());
    }

    #[test]
    fn role_guard_messages() {
        assert!(check_role(Some(&user(Some("ADMIN"))), ADMIN).is_ok());
        let denied = check_role(Some(&user(Some("hod"))), ADMIN).unwrap_err();
        assert_eq!(denied.to_string(), "Access denied. Required roles: admin, super_admin");
        let anonymous = check_role(None, MEMBERS).unwrap_err();
        assert_eq!(anonymous.to_string(), "Authentication required");
        assert!(check_role(Some(&user(None)), MEMBERS).is_err());
    }

    #[test]
    fn audit_context_reads_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));
        let ctx = audit_context(&user(Some("admin")), &headers);
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8"));
    }
}
