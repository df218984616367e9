pub mod password;

use api_types::User;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{AppState, db::sessions::SessionRepository, routes::error::ErrorResponse};

pub const SESSION_COOKIE: &str = "taskboard_session";

/// Per-request identity, inserted by [`require_session`] and read by
/// handlers through `Extension<RequestContext>`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
}

/// Opaque bearer token handed to the client in the session cookie.
/// Only its SHA-256 digest is stored server-side.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn session_cookie(token: String, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::hours(ttl_hours))
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build();
    cookie.make_removal();
    cookie
}

/// Session middleware. Resolves the cookie to a live session and attaches
/// the authenticated user; requests without one are rejected with a
/// generic 401.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Err(ErrorResponse::unauthorized());
    };

    let digest = token_digest(cookie.value());
    let user = SessionRepository::find_user_by_token_hash(state.pool(), &digest, Utc::now())
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to load session");
            ErrorResponse::internal("failed to load session")
        })?
        .ok_or_else(ErrorResponse::unauthorized)?;

    request.extensions_mut().insert(RequestContext { user });
    Ok(next.run(request).await)
}
