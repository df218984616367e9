use api_types::{ApiResponse, LoginRequest, RegisterRequest, User};
use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::{
        self, RequestContext, expired_session_cookie, generate_session_token, password,
        session_cookie, token_digest,
    },
    db::{sessions::SessionRepository, users::UserRepository},
};

/// Routes reachable without a session.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes that sit behind the session middleware.
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/current", get(current))
}

#[instrument(name = "auth.register", skip(state, jar, payload))]
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<ApiResponse<User>>), ErrorResponse> {
    let password_hash = password::hash(&payload.password).map_err(|error| {
        tracing::error!(?error, "failed to hash password");
        ErrorResponse::internal("failed to register")
    })?;

    let user = UserRepository::create(state.pool(), &payload.name, &payload.email, &password_hash)
        .await
        .map_err(|error| match error {
            crate::db::users::UserError::EmailTaken => {
                ErrorResponse::new(StatusCode::CONFLICT, "email already registered")
            }
            other => {
                tracing::error!(?other, "failed to create user");
                ErrorResponse::internal("failed to register")
            }
        })?;

    let jar = issue_session(&state, jar, &user).await?;
    Ok((jar, Json(ApiResponse::new(user))))
}

#[instrument(name = "auth.login", skip(state, jar, payload))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<User>>), ErrorResponse> {
    let credentials = UserRepository::find_by_email(state.pool(), &payload.email)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to look up user");
            ErrorResponse::internal("failed to log in")
        })?;

    // Same response for unknown email and wrong password.
    let Some(credentials) = credentials else {
        return Err(ErrorResponse::new(
            StatusCode::UNAUTHORIZED,
            "invalid credentials",
        ));
    };

    let verified =
        password::verify(&payload.password, &credentials.password_hash).map_err(|error| {
            tracing::error!(?error, "stored password hash is unusable");
            ErrorResponse::internal("failed to log in")
        })?;
    if !verified {
        return Err(ErrorResponse::new(
            StatusCode::UNAUTHORIZED,
            "invalid credentials",
        ));
    }

    let jar = issue_session(&state, jar, &credentials.user).await?;
    Ok((jar, Json(ApiResponse::new(credentials.user))))
}

#[instrument(name = "auth.logout", skip(state, jar))]
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<()>>), ErrorResponse> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        SessionRepository::delete_by_token_hash(state.pool(), &token_digest(cookie.value()))
            .await
            .map_err(|error| {
                tracing::error!(?error, "failed to delete session");
                ErrorResponse::internal("failed to log out")
            })?;
    }

    Ok((
        jar.add(expired_session_cookie()),
        Json(ApiResponse::new(())),
    ))
}

#[instrument(name = "auth.current", skip(ctx))]
async fn current(Extension(ctx): Extension<RequestContext>) -> Json<ApiResponse<User>> {
    Json(ApiResponse::new(ctx.user))
}

async fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<CookieJar, ErrorResponse> {
    let token = generate_session_token();
    let ttl_hours = state.config().session_ttl_hours;

    SessionRepository::create(state.pool(), user.id, &token_digest(&token), ttl_hours)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to create session");
            ErrorResponse::internal("failed to create session")
        })?;

    Ok(jar.add(session_cookie(token, ttl_hours)))
}
