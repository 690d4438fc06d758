//! Session middleware for protected endpoints.
//!
//! Reads the `access_token` cookie, resolves it to a stored user through the
//! [`AuthManager`](reviewroot::AuthManager), and injects [`CurrentUser`] into
//! request extensions for downstream handlers.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use rr_server::api::middleware::require_session;
//! # use rr_server::api::AppState;
//! # async fn handler() {}
//! # let state: AppState = unimplemented!();
//!
//! let protected_routes: Router = Router::new()
//!     .route("/api/protected", get(handler))
//!     .layer(middleware::from_fn_with_state(state.clone(), require_session))
//!     .with_state(state);
//! # let _ = protected_routes;
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use reviewroot::auth::{AuthError, User};

use super::{AppState, cookies::ACCESS_COOKIE, error::ApiError};
use crate::metrics;

/// The user behind the request's access token.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Reject the request with 401 unless it carries a valid access cookie for an
/// existing user.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()) else {
        metrics::session_rejections_total();
        return Err(AuthError::Unauthenticated.into());
    };

    let user = match state.auth.authenticate(&token).await {
        Ok(user) => user,
        Err(err) => {
            if matches!(err, AuthError::Unauthenticated) {
                metrics::session_rejections_total();
            }
            return Err(err.into());
        }
    };

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
