//! Session cookies.
//!
//! Both tokens travel as HttpOnly cookies scoped to the whole site. Max-ages
//! follow the configured token lifetimes.

use axum_extra::extract::cookie::{Cookie, SameSite};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: chrono::Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

pub fn access_cookie(token: String, ttl: chrono::Duration) -> Cookie<'static> {
    session_cookie(ACCESS_COOKIE, token, ttl)
}

pub fn refresh_cookie(token: String, ttl: chrono::Duration) -> Cookie<'static> {
    session_cookie(REFRESH_COOKIE, token, ttl)
}

/// An empty cookie that expires immediately, clearing `name` in the browser.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    session_cookie(name, String::new(), chrono::Duration::zero())
}
