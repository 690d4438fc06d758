//! HTTP API for the ReviewRoot server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework
//! - **Tower**: Middleware for CORS, request IDs, session checks
//! - **JWT in cookies**: Stateless access/refresh tokens
//!
//! # Modules
//!
//! - [`auth`]: Register, login, token refresh, logout
//! - [`users`]: Own profile, public profiles, user listing
//! - [`middleware`]: Session middleware for protected endpoints
//! - [`cookies`]: Session cookie construction
//! - [`error`]: Error to status-code translation
//! - [`request_id`]: Request correlation and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /                             - Service banner (public)
//! GET    /health                       - Health check (public)
//! POST   /api/auth/register            - Register user (public)
//! POST   /api/auth/login               - Login (public)
//! POST   /api/auth/refresh             - New access cookie from refresh cookie
//! POST   /api/auth/logout              - Clear session cookies (public)
//! GET    /api/auth/users/{username}    - Public profile (public)
//! GET    /api/auth/me                  - Own profile (auth required)
//! PUT    /api/auth/update-me           - Update bio/avatar (auth required)
//! DELETE /api/auth/delete-me           - Delete account (auth required)
//! GET    /api/auth/users               - All other users (auth required)
//! ```
//!
//! # CORS
//!
//! CORS mirrors the request origin and allows credentials, so browser
//! clients on another origin can send the session cookies. In production,
//! restrict the allowed origins.

pub mod auth;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod request_id;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use reviewroot::{
    auth::{AuthManager, TokenService},
    db::UserRepository,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService) -> Self {
        Self {
            auth: Arc::new(AuthManager::new(users.clone(), tokens)),
            users,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use rr_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/auth", create_auth_router(state.clone()))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn create_auth_router(state: AppState) -> Router<AppState> {
    // Public routes (no session middleware)
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/users/{username}", get(users::get_user));

    // Protected routes (require a valid access cookie)
    let protected_routes = Router::new()
        .route("/me", get(users::me))
        .route("/update-me", put(users::update_me))
        .route("/delete-me", delete(users::delete_me))
        .route("/users", get(users::list_users))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::require_session,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "ReviewRoot API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the user store answers, `503 Service Unavailable`
/// otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.users.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
