//! Authentication module providing user registration, login, and session management.
//!
//! This module implements stateless authentication with:
//! - Argon2id password hashing, one random salt per hash
//! - HMAC-signed JWT access tokens (24-hour expiry by default)
//! - Refresh tokens (7-day expiry) that only mint new access tokens
//!
//! ## Example
//!
//! ```no_run
//! use reviewroot::auth::{AuthManager, RegisterRequest, TokenService, TokenSettings};
//! use reviewroot::db::MemoryUserRepository;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = AuthManager::new(
//!         Arc::new(MemoryUserRepository::new()),
//!         TokenService::new(TokenSettings::new("a_signing_secret_of_at_least_32_chars")),
//!     );
//!
//!     let request = RegisterRequest {
//!         username: "reviewer1".to_string(),
//!         email: "reviewer@example.com".to_string(),
//!         password: "secret1".to_string(),
//!     };
//!
//!     let user = auth.register(request).await?;
//!     println!("Registered user: {}", user.username);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod password;
pub mod tokens;

pub use errors::{AuthError, AuthResult, FieldViolation};
pub use manager::{AuthManager, check_profile_update};
pub use models::{
    LoginRequest, NewUser, ProfileUpdate, RegisterRequest, SessionTokens, User, UserId,
};
pub use password::CredentialHasher;
pub use tokens::{Claims, TokenError, TokenKind, TokenService, TokenSettings, parse_hmac_algorithm};
