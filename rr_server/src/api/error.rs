//! Translation of domain errors into HTTP responses.
//!
//! This is the only place status codes are chosen for failures. Store and
//! hashing failures are logged here and reach the client as a generic 500.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reviewroot::auth::{AuthError, FieldViolation, TokenError};
use serde::Serialize;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

/// Handler error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Request body could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Auth(err) => match err {
                AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                AuthError::UsernameTaken | AuthError::EmailTaken => {
                    (StatusCode::BAD_REQUEST, "conflict")
                }
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "invalid_credentials")
                }
                AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
                AuthError::RefreshTokenMissing | AuthError::UserNotFound => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                AuthError::InvalidRefreshToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
                AuthError::Token(TokenError::Signing(_) | TokenError::LifetimeOutOfRange) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
                AuthError::Token(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
                AuthError::Database(_) | AuthError::HashingFailed | AuthError::TaskFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        let body = match self {
            ApiError::Auth(err) => {
                if err.is_internal() {
                    tracing::error!(error = %err, "Request failed");
                }
                let error = err.client_message();
                let details = match err {
                    AuthError::Validation(violations) => Some(violations),
                    _ => None,
                };
                ErrorResponse {
                    error,
                    error_type,
                    details,
                }
            }
            other => ErrorResponse {
                error: other.to_string(),
                error_type,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
