//! Authentication API handlers.
//!
//! Registration, login, token refresh and logout. Successful logins set the
//! `access_token` and `refresh_token` cookies and also echo both tokens in the
//! body for non-browser clients.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:8000/api/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "reviewer1", "email": "reviewer@example.com", "password": "secret1"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -c cookies.txt -X POST http://localhost:8000/api/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "reviewer@example.com", "password": "secret1"}'
//! ```

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::extract::CookieJar;
use reviewroot::auth::{AuthError, LoginRequest, RegisterRequest, UserId};
use serde::Serialize;

use super::{
    AppState,
    cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE},
    error::ApiError,
    request_id::RequestId,
};
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Register a new user account.
///
/// # Request Body
///
/// ```json
/// {
///   "username": "reviewer1",
///   "email": "reviewer@example.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"message": "User registered successfully", "userId": "<uuid>"}`.
///
/// # Errors
///
/// - `400 Bad Request`: invalid fields (with per-field `details`), or the
///   email or username is already in use
pub async fn register(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload?;

    match state.auth.register(request).await {
        Ok(user) => {
            metrics::registrations_total("created");
            tracing::info!(%request_id, user_id = %user.id, "User registered");
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "User registered successfully",
                    user_id: user.id,
                }),
            ))
        }
        Err(err) => {
            let outcome = match &err {
                AuthError::EmailTaken | AuthError::UsernameTaken => "conflict",
                AuthError::Validation(_) => "invalid",
                _ => "error",
            };
            metrics::registrations_total(outcome);
            tracing::info!(%request_id, outcome, "Registration rejected");
            Err(err.into())
        }
    }
}

/// Login with email and password.
///
/// # Response
///
/// `200 OK` with both tokens and the user id, plus two `Set-Cookie` headers.
///
/// # Errors
///
/// - `401 Unauthorized`: `Invalid email or password`, whether the email is
///   unknown or the password is wrong
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let Json(request) = payload?;

    let (user, tokens) = state.auth.login(request).await.inspect_err(|err| {
        if matches!(err, AuthError::InvalidCredentials) {
            metrics::login_attempts_total(false);
            logging::log_security_event("failed_login", None, "Invalid email or password");
        }
    })?;
    metrics::login_attempts_total(true);

    let ttl = state.auth.tokens();
    let jar = jar
        .add(cookies::access_cookie(
            tokens.access_token.clone(),
            ttl.access_ttl(),
        ))
        .add(cookies::refresh_cookie(
            tokens.refresh_token.clone(),
            ttl.refresh_ttl(),
        ));

    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful",
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user_id: user.id,
        }),
    ))
}

/// Exchange the `refresh_token` cookie for a new access cookie.
///
/// The refresh token is not rotated.
///
/// # Errors
///
/// - `404 Not Found`: no refresh cookie
/// - `401 Unauthorized`: refresh token invalid, expired, or not a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let presented = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let access_token = state
        .auth
        .refresh(presented.as_deref())
        .await
        .inspect_err(|_| metrics::token_refreshes_total(false))?;
    metrics::token_refreshes_total(true);

    let jar = jar.add(cookies::access_cookie(
        access_token,
        state.auth.tokens().access_ttl(),
    ));

    Ok((
        jar,
        Json(MessageResponse {
            message: "Token refreshed successfully",
        }),
    ))
}

/// Clear both session cookies.
///
/// Tokens are stateless, so there is nothing to revoke server side.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar
        .add(cookies::removal_cookie(ACCESS_COOKIE))
        .add(cookies::removal_cookie(REFRESH_COOKIE));

    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}
