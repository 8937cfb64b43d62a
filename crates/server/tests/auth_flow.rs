use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use tower::Service;
use uuid::Uuid;

use configs::AppConfig;
use server::routes;
use server::state::ServerState;
use service::auth::domain::Claims;
use service::seed::{self, AdminSeed, SeedOutcome};

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = "test-secret".into();
    cfg
}

fn offline_app() -> (Router, ServerState) {
    let state = ServerState::new(DatabaseConnection::Disconnected, test_config());
    (routes::build_router(state.clone()), state)
}

async fn db_app() -> anyhow::Result<Option<(Router, DatabaseConnection)>> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(None);
    }
    let Ok(db) = models::db::connect().await else { return Ok(None) };
    migration::Migrator::up(&db, None).await?;
    let state = ServerState::new(db.clone(), test_config());
    Ok(Some((routes::build_router(state), db)))
}

async fn send(app: &mut Router, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let resp = app.call(req).await?;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, body))
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    b.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut b = Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    b.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap()
}

#[tokio::test]
async fn test_health_root_and_fallback() -> anyhow::Result<()> {
    let (mut app, _) = offline_app();

    let (status, body) = send(&mut app, get("/health", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&mut app, get("/", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "API Server is running!");
    assert_eq!(body["version"], "api/v1");

    let (status, body) = send(&mut app, get("/api/v1/nowhere", None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["type"], "NOT_FOUND");
    assert_eq!(body["message"], "Route /api/v1/nowhere not found");

    let resp = app.call(get("/metrics", None)).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_openapi_document_is_served() -> anyhow::Result<()> {
    let (mut app, _) = offline_app();
    let (status, body) = send(&mut app, get("/api-docs/openapi.json", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/auth/login").is_some());
    Ok(())
}

#[tokio::test]
async fn test_protected_routes_require_a_token() -> anyhow::Result<()> {
    let (mut app, state) = offline_app();

    let (status, body) = send(&mut app, get("/api/v1/tasks", None)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization Token Missing");

    let (status, body) = send(&mut app, get("/api/v1/tasks", Some("not-a-jwt"))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization Token Invalid");

    let now = Utc::now().timestamp();
    let expired = state.auth.encode_claims(&Claims { sub: Uuid::new_v4().to_string(), iat: now - 7200, exp: now - 3600, nbf: None })?;
    let (status, body) = send(&mut app, get("/api/v1/user-management/users", Some(&expired))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization Token Expired");

    let immature = state.auth.encode_claims(&Claims { sub: Uuid::new_v4().to_string(), iat: now, exp: now + 3600, nbf: Some(now + 1800) })?;
    let (status, body) = send(&mut app, get("/api/v1/projects", Some(&immature))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization Token Signature Mismatched");
    Ok(())
}

#[tokio::test]
async fn test_public_routes_validate_before_touching_the_database() -> anyhow::Result<()> {
    let (mut app, _) = offline_app();

    let (status, body) = send(&mut app, get("/api/v1/user-management/organizations?page_size=500", None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Page size must be between 1 and 100");

    let (status, body) = send(&mut app, get("/api/v1/user-management/roles?search_string=a", None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search string must be at least 2 characters long");

    let (status, body) = send(&mut app, get("/api/v1/user-management/organizations/not-a-uuid", None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Organization ID format");

    let (status, body) = send(&mut app, post_json("/api/v1/auth/login", None, json!({"email": "nope", "password": "x"}))).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["type"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn test_logout_clears_cookie() -> anyhow::Result<()> {
    let (mut app, _) = offline_app();
    let req = Request::builder().method("POST").uri("/api/v1/auth/logout").body(Body::empty())?;
    let resp = app.call(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookie = resp.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("ATHID="));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Path=/"));
    Ok(())
}

async fn login(app: &mut Router, email: &str, password: &str) -> anyhow::Result<(StatusCode, Value)> {
    send(app, post_json("/api/v1/auth/login", None, json!({"email": email, "password": password}))).await
}

#[tokio::test]
async fn test_login_project_and_task_flow() -> anyhow::Result<()> {
    let Some((mut app, db)) = db_app().await? else { return Ok(()) };

    let email = format!("admin_{}@example.com", Uuid::new_v4().simple());
    let seeded = seed::ensure_admin(
        &db,
        &AdminSeed { email: email.clone(), password: "S3curePass!".into(), first_name: "Flow".into(), last_name: "Admin".into() },
    )
    .await?;
    let SeedOutcome::Created(admin_id) = seeded else { panic!("expected a fresh admin") };

    // Login with an uppercased email and check the cookie
    let req = post_json("/api/v1/auth/login", None, json!({"email": email.to_uppercase(), "password": "S3curePass!"}));
    let resp = app.call(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(cookie.contains("ATHID="));
    assert!(cookie.contains("HttpOnly"));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["message"], "Login Successful");
    let token = body["data"]["accessToken"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["user"]["role"], "admin");

    let (status, body) = login(&mut app, &email, "wrong-password").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Login Credentials Invalid");

    let (status, body) = login(&mut app, "ghost@example.com", "whatever1").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Given Email not found in the system. Please check with the admin.");

    // Project then task under it
    let code = format!("F{}", &Uuid::new_v4().simple().to_string()[..5]).to_uppercase();
    let (status, body) = send(
        &mut app,
        post_json("/api/v1/projects", Some(&token), json!({"title": format!("Flow {}", code), "code": code})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let project_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let due = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let (status, body) = send(
        &mut app,
        post_json(
            "/api/v1/tasks",
            Some(&token),
            json!({"title": "Wire the router", "projectId": project_id, "dueDate": due, "assignees": [admin_id]}),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Task added successfully");
    assert_eq!(body["data"]["refId"], format!("{}-1", code));
    assert_eq!(body["data"]["assignees"][0]["id"], admin_id.to_string());

    let (status, body) = send(&mut app, get(&format!("/api/v1/tasks?project_id={}", project_id), Some(&token))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination_info"]["total_records"], 1);

    // Cookie-only auth works too
    let session = cookie.split(';').next().unwrap_or_default().to_string();
    let req = Request::builder().method("GET").uri("/api/v1/user-management/users/my").header(header::COOKIE, session).body(Body::empty())?;
    let (status, body) = send(&mut app, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], email);

    let pid = Uuid::parse_str(&project_id)?;
    models::task::Entity::delete_many().filter(models::task::Column::ProjectId.eq(pid)).exec(&db).await?;
    models::project::Entity::delete_by_id(pid).exec(&db).await?;
    models::user::hard_delete(&db, admin_id).await?;
    Ok(())
}

#[tokio::test]
async fn test_role_guard_rejects_unknown_roles() -> anyhow::Result<()> {
    let Some((mut app, db)) = db_app().await? else { return Ok(()) };

    let email = format!("guest_{}@example.com", Uuid::new_v4().simple());
    let seeded = seed::ensure_user_with_role(
        &db,
        &AdminSeed { email: email.clone(), password: "GuestPass1".into(), first_name: "Gu".into(), last_name: "Est".into() },
        "guest",
    )
    .await?;
    let SeedOutcome::Created(guest_id) = seeded else { panic!("expected a fresh user") };

    let (status, body) = login(&mut app, &email, "GuestPass1").await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["accessToken"].as_str().unwrap_or_default().to_string();

    let (status, body) = send(&mut app, get("/api/v1/tasks", Some(&token))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied. Required roles: user, admin, super_admin, hod");

    let (status, body) = send(&mut app, post_json("/api/v1/user-management/users", Some(&token), json!({}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied. Required roles: admin, super_admin");

    models::user::hard_delete(&db, guest_id).await?;
    Ok(())
}
