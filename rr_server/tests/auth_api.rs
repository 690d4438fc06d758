//! Integration tests for the authentication HTTP API.
//!
//! The router runs against the in-memory user store, so no database is needed.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use reviewroot::auth::{TokenService, TokenSettings};
use reviewroot::db::MemoryUserRepository;
use rr_server::api::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "integration_test_secret_at_least_32_chars";

/// Helper to create test server with an empty user store
fn create_test_server() -> (Router, TokenService) {
    let tokens = TokenService::new(TokenSettings::new(SECRET));
    let state = AppState::new(Arc::new(MemoryUserRepository::new()), tokens.clone());
    (create_router(state), tokens)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of cookie `name` among `Set-Cookie` headers.
fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    cookies.iter().find_map(|c| {
        c.strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    })
}

async fn register(app: &Router, username: &str, email: &str) -> Response<Body> {
    send(
        app,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": username, "email": email, "password": "secret1" })),
        None,
    )
    .await
}

/// Register and log in, returning the user id and the two cookie headers.
async fn register_and_login(app: &Router, username: &str, email: &str) -> (String, String, String) {
    let response = register(app, username, email).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": email, "password": "secret1" })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let access = cookie_value(&cookies, "access_token").unwrap();
    let refresh = cookie_value(&cookies, "refresh_token").unwrap();
    let body = body_json(response).await;

    (
        body["userId"].as_str().unwrap().to_string(),
        format!("access_token={access}"),
        format!("refresh_token={refresh}"),
    )
}

// ============================================================================
// Service Endpoints
// ============================================================================

#[tokio::test]
async fn test_root_and_health() {
    let (app, _) = create_test_server();

    let response = send(&app, "GET", "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["message"].is_string());

    let response = send(&app, "GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_request_id_generated_and_propagated() {
    let (app, _) = create_test_server();

    let response = send(&app, "GET", "/health", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-abc");
}

#[tokio::test]
async fn test_cors_allows_credentialed_origin() {
    let (app, _) = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://app.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_returns_user_id() {
    let (app, _) = create_test_server();

    let response = register(&app, "alice", "a@x.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["message"], "User registered successfully");
    assert!(uuid::Uuid::parse_str(body["userId"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_register_conflicts() {
    let (app, _) = create_test_server();
    register(&app, "alice", "a@x.com").await;

    let response = register(&app, "bob", "a@x.com").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Email already registered");
    assert_eq!(body["error_type"], "conflict");

    let response = register(&app, "alice", "b@x.com").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Username already taken");
}

#[tokio::test]
async fn test_register_validation_details() {
    let (app, _) = create_test_server();

    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": "a!", "email": "nope", "password": "123" })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error_type"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _) = create_test_server();

    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": "alice" })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error_type"], "bad_request");
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_sets_cookies_and_returns_tokens() {
    let (app, _) = create_test_server();
    register(&app, "alice", "a@x.com").await;

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "a@x.com", "password": "secret1" })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    let access = cookies.iter().find(|c| c.starts_with("access_token=")).unwrap();
    let refresh = cookies.iter().find(|c| c.starts_with("refresh_token=")).unwrap();
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("Max-Age=86400"));
    assert!(access.contains("Path=/"));
    assert!(refresh.contains("HttpOnly"));
    assert!(refresh.contains("Max-Age=604800"));

    let body = body_json(response).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(
        body["access_token"].as_str(),
        cookie_value(&cookies, "access_token").as_deref()
    );
    assert_eq!(
        body["refresh_token"].as_str(),
        cookie_value(&cookies, "refresh_token").as_deref()
    );
    assert!(body["userId"].is_string());
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let (app, _) = create_test_server();
    register(&app, "alice", "a@x.com").await;

    let wrong_password = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "a@x.com", "password": "wrong1" })),
        None,
    )
    .await;
    let unknown_email = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "ghost@x.com", "password": "secret1" })),
        None,
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&wrong_password).is_empty());

    let a = body_json(wrong_password).await;
    let b = body_json(unknown_email).await;
    assert_eq!(a, b);
    assert_eq!(a["error"], "Invalid email or password");
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_me_requires_cookie() {
    let (app, _) = create_test_server();

    let response = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn test_me_returns_profile() {
    let (app, _) = create_test_server();
    let (user_id, access, _) = register_and_login(&app, "alice", "a@x.com").await;

    let response = send(&app, "GET", "/api/auth/me", None, Some(&access)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], user_id);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["followersCount"], 0);
    assert_eq!(body["followingCount"], 0);
    assert!(body["createdAt"].is_string());
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let (app, _) = create_test_server();
    let (_, _, refresh) = register_and_login(&app, "alice", "a@x.com").await;
    let as_access = refresh.replacen("refresh_token=", "access_token=", 1);

    let response = send(&app, "GET", "/api/auth/me", None, Some(&as_access)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_access_token_rejected() {
    let (app, _) = create_test_server();
    let (user_id, _, _) = register_and_login(&app, "alice", "a@x.com").await;

    let forger = TokenService::new(TokenSettings::new("another_secret_that_is_32_chars_long"));
    let forged = forger.issue_access(&user_id).unwrap();

    let cookie = format!("access_token={forged}");
    let response = send(&app, "GET", "/api/auth/me", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_access_then_refresh_scenario() {
    let (app, tokens) = create_test_server();
    let (user_id, _, refresh) = register_and_login(&app, "alice", "a@x.com").await;

    let stale = tokens
        .issue_access_at(&user_id, Utc::now() - Duration::hours(25))
        .unwrap();
    let cookie = format!("access_token={stale}");
    let response = send(&app, "GET", "/api/auth/me", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "POST", "/api/auth/refresh", None, Some(&refresh)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1, "Only the access cookie is reissued");
    let fresh = cookie_value(&cookies, "access_token").unwrap();
    assert!(cookies[0].contains("Max-Age=86400"));

    let body = body_json(response).await;
    assert_eq!(body["message"], "Token refreshed successfully");

    let cookie = format!("access_token={fresh}");
    let response = send(&app, "GET", "/api/auth/me", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], user_id);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn test_refresh_without_cookie_is_not_found() {
    let (app, _) = create_test_server();

    let response = send(&app, "POST", "/api/auth/refresh", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_rejects_bad_tokens() {
    let (app, tokens) = create_test_server();
    let (user_id, access, _) = register_and_login(&app, "alice", "a@x.com").await;

    let stale = tokens
        .issue_refresh_at(&user_id, Utc::now() - Duration::days(8))
        .unwrap();
    let cookie = format!("refresh_token={stale}");
    let response = send(&app, "POST", "/api/auth/refresh", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let as_refresh = access.replacen("access_token=", "refresh_token=", 1);
    let response = send(&app, "POST", "/api/auth/refresh", None, Some(&as_refresh)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some("refresh_token=garbage"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let (app, _) = create_test_server();

    let response = send(&app, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    for name in ["access_token", "refresh_token"] {
        let cookie = cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .unwrap();
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(cookie_value(&cookies, name).as_deref(), Some(""));
    }
}

// ============================================================================
// Profiles
// ============================================================================

#[tokio::test]
async fn test_update_me_changes_only_given_fields() {
    let (app, _) = create_test_server();
    let (_, access, _) = register_and_login(&app, "alice", "a@x.com").await;

    let response = send(
        &app,
        "PUT",
        "/api/auth/update-me",
        Some(json!({ "bio": "Reviews Rust code" })),
        Some(&access),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["bio"], "Reviews Rust code");
    assert!(body["avatar"].is_null());

    let response = send(
        &app,
        "PUT",
        "/api/auth/update-me",
        Some(json!({ "avatar": "https://example.com/a.png" })),
        Some(&access),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["bio"], "Reviews Rust code");
    assert_eq!(body["avatar"], "https://example.com/a.png");
}

#[tokio::test]
async fn test_update_me_rejects_long_bio() {
    let (app, _) = create_test_server();
    let (_, access, _) = register_and_login(&app, "alice", "a@x.com").await;

    let response = send(
        &app,
        "PUT",
        "/api/auth/update-me",
        Some(json!({ "bio": "x".repeat(201) })),
        Some(&access),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"][0]["field"], "bio");
}

#[tokio::test]
async fn test_update_me_requires_session() {
    let (app, _) = create_test_server();

    let response = send(
        &app,
        "PUT",
        "/api/auth/update-me",
        Some(json!({ "bio": "hi" })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_profile_lookup() {
    let (app, _) = create_test_server();
    register(&app, "alice", "a@x.com").await;

    let response = send(&app, "GET", "/api/auth/users/alice", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");

    let response = send(&app, "GET", "/api/auth/users/nobody", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_list_users_excludes_caller() {
    let (app, _) = create_test_server();
    register(&app, "bob", "b@x.com").await;
    register(&app, "carol", "c@x.com").await;
    let (_, access, _) = register_and_login(&app, "alice", "a@x.com").await;

    let response = send(&app, "GET", "/api/auth/users", None, Some(&access)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let names: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"bob"));
    assert!(names.contains(&"carol"));
    assert!(!names.contains(&"alice"));

    let response = send(&app, "GET", "/api/auth/users", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_me_ends_session() {
    let (app, _) = create_test_server();
    let (_, access, _) = register_and_login(&app, "alice", "a@x.com").await;

    let response = send(&app, "DELETE", "/api/auth/delete-me", None, Some(&access)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(cookies.len(), 2);

    let response = send(&app, "GET", "/api/auth/me", None, Some(&access)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/api/auth/users/alice", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The email is free again
    let response = register(&app, "alice", "a@x.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);
}
