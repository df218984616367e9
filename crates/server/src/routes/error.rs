use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::images::ImageError;

#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Generic 401 used for missing sessions and missing membership alike.
    /// No detail leaks about which one it was.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ImageError> for ErrorResponse {
    fn from(error: ImageError) -> Self {
        match error {
            ImageError::InvalidFormat => ErrorResponse::bad_request(error.to_string()),
            ImageError::TooLarge(..) => {
                ErrorResponse::new(StatusCode::PAYLOAD_TOO_LARGE, error.to_string())
            }
        }
    }
}

/// Maps a repository error onto a response, surfacing constraint
/// violations instead of a blanket 500.
pub(crate) fn db_error(
    error: impl std::error::Error + 'static,
    fallback_message: &str,
) -> ErrorResponse {
    let error: &(dyn std::error::Error + 'static) = &error;
    let mut current = Some(error);

    while let Some(err) = current {
        if let Some(sqlx_error) = err.downcast_ref::<sqlx::Error>() {
            if let sqlx::Error::Database(db_err) = sqlx_error {
                if db_err.is_unique_violation() {
                    return ErrorResponse::new(StatusCode::CONFLICT, "resource already exists");
                }
                if db_err.is_foreign_key_violation() {
                    return ErrorResponse::new(StatusCode::NOT_FOUND, "related resource not found");
                }
            }
            break;
        }
        current = err.source();
    }

    ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, fallback_message)
}
