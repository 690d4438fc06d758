//! Profile endpoints.
//!
//! Everything here except [`get_user`] runs behind
//! [`require_session`](super::middleware::require_session).

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use reviewroot::auth::{AuthError, ProfileUpdate, User, UserId, check_profile_update};
use serde::Serialize;

use super::{
    AppState,
    auth::MessageResponse,
    cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE},
    error::ApiError,
    middleware::CurrentUser,
};
use crate::logging;

/// Public view of a user. The password hash never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub followers_count: usize,
    pub following_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            bio: user.bio,
            followers_count: user.followers.len(),
            following_count: user.following.len(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

/// The authenticated user's own profile.
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(user.into())
}

/// Update bio and/or avatar. Omitted fields are left as they are.
///
/// # Errors
///
/// - `400 Bad Request`: bio longer than 200 characters
/// - `404 Not Found`: the account was deleted mid-request
pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(update) = payload?;
    check_profile_update(&update)?;

    if update.is_empty() {
        return Ok(Json(user.into()));
    }

    let updated = state
        .users
        .update_profile(user.id, &update)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    tracing::debug!(user_id = %user.id, "Profile updated");
    Ok(Json(updated.into()))
}

/// Delete the authenticated account and clear its session cookies.
///
/// Outstanding tokens stop working because the session middleware can no
/// longer resolve their subject.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    if !state.users.delete_user(user.id).await? {
        return Err(AuthError::UserNotFound.into());
    }

    logging::log_security_event(
        "account_deleted",
        Some(&user.id.to_string()),
        "User deleted their account",
    );

    let jar = jar
        .add(cookies::removal_cookie(ACCESS_COOKIE))
        .add(cookies::removal_cookie(REFRESH_COOKIE));

    Ok((
        jar,
        Json(MessageResponse {
            message: "User deleted successfully",
        }),
    ))
}

/// Look up a user by username. Public.
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&username.to_lowercase())
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(user.into()))
}

/// Every user except the caller.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.users.list_users_except(user.id).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}
