//! # ReviewRoot
//!
//! User accounts and stateless session management for the ReviewRoot service.
//!
//! Users register with a username, email and password, log in to receive a
//! short-lived access token and a long-lived refresh token, and present the
//! access token to reach protected resources. Tokens are HMAC-signed JWTs, so
//! nothing about a session is stored server-side.
//!
//! ## Core Modules
//!
//! - [`auth`]: Password hashing, token issuance and validation, and the
//!   [`AuthManager`] that ties them to the user store
//! - [`db`]: PostgreSQL pool, schema migrations, and the [`UserRepository`]
//!   implementations
//!
//! ## Example
//!
//! ```
//! use reviewroot::auth::{TokenKind, TokenService, TokenSettings};
//!
//! let tokens = TokenService::new(TokenSettings::new("a_signing_secret_of_at_least_32_chars"));
//! let access = tokens.issue_access("user-1").unwrap();
//! assert_eq!(tokens.validate(&access, TokenKind::Access).unwrap(), "user-1");
//! ```

/// Credentials, tokens, and the authentication workflow.
pub mod auth;
pub use auth::{AuthError, AuthManager, AuthResult, User, UserId};

/// Persistence for user accounts.
pub mod db;
pub use db::{Database, DatabaseConfig, MemoryUserRepository, UserRepository};
