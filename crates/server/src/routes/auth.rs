use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use service::auth::domain::{AuthUser, LoginInput};

use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::response;
use crate::routes::no_content;
use crate::state::ServerState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutput {
    pub access_token: String,
    pub user: AuthUser,
}

pub fn router(_state: &ServerState) -> Router<ServerState> {
    Router::new().route("/login", post(login)).route("/logout", post(logout))
}

fn auth_cookie(state: &ServerState, value: String) -> Cookie<'static> {
    let cfg = &state.config;
    let mut cookie = Cookie::new(cfg.auth.cookie_name.clone(), value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(cfg.secure_cookies());
    cookie.set_same_site(SameSite::Strict);
    if let Some(domain) = cfg.auth.cookie_domain.clone() {
        cookie.set_domain(domain);
    }
    cookie
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Login Successful"), (status = 401, description = "Unauthorized"), (status = 404, description = "Email not found"), (status = 422, description = "Validation error")))]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, ApiJson(input): ApiJson<LoginInput>) -> Result<(CookieJar, Response), ApiError> {
    let session = state.auth.login(input).await?;
    let jar = jar.add(auth_cookie(&state, session.token.clone()));
    let out = LoginOutput { access_token: session.token, user: session.user };
    Ok((jar, response::ok("Login Successful", out)))
}

#[utoipa::path(post, path = "/auth/logout", tag = "auth", responses((status = 204, description = "Cookie cleared")))]
pub async fn logout(State(state): State<ServerState>, jar: CookieJar) -> (CookieJar, Response) {
    // always send the expired cookie, even when the request carried none
    let mut cookie = auth_cookie(&state, String::new());
    cookie.make_removal();
    (jar.add(cookie), no_content())
}
