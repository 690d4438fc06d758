//! Authentication error types.

use serde::Serialize;
use thiserror::Error;

use super::tokens::TokenError;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Hashing task was cancelled or panicked
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Request payload failed validation
    #[error("Validation failed")]
    Validation(Vec<FieldViolation>),

    /// Username already exists
    #[error("Username already taken")]
    UsernameTaken,

    /// Email already exists
    #[error("Email already registered")]
    EmailTaken,

    /// Unknown email or wrong password; the two are never distinguished
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing access cookie, rejected access token, or the user behind it is gone
    #[error("Not authenticated")]
    Unauthenticated,

    /// No refresh cookie on a refresh request
    #[error("Refresh token not found")]
    RefreshTokenMissing,

    /// Refresh token failed validation
    #[error("Invalid refresh token")]
    InvalidRefreshToken(#[source] TokenError),

    /// Token signing or validation error
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// User not found
    #[error("User not found")]
    UserNotFound,
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database, task and token errors are sanitized so that neither the
    /// storage layout nor the reason a token was rejected reaches the client.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::TaskFailed(_) | AuthError::HashingFailed => {
                "Internal server error".to_string()
            }
            AuthError::Token(TokenError::Signing(_) | TokenError::LifetimeOutOfRange) => {
                "Internal server error".to_string()
            }
            AuthError::Token(_) => "Invalid token".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error came from the user store rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Database(_)
                | AuthError::TaskFailed(_)
                | AuthError::HashingFailed
                | AuthError::Token(TokenError::Signing(_) | TokenError::LifetimeOutOfRange)
        )
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AuthError::Validation(vec![FieldViolation::new(field, message)])
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
