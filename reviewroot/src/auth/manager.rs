//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult, FieldViolation},
    models::{LoginRequest, NewUser, ProfileUpdate, RegisterRequest, SessionTokens, User},
    password::CredentialHasher,
    tokens::{TokenKind, TokenService},
};
use crate::db::UserRepository;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Authentication manager
///
/// Owns the credential hasher and token service and reaches users only
/// through the injected [`UserRepository`].
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
    tokens: TokenService,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - User store
    /// * `tokens` - Token service carrying the signing secret and lifetimes
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService) -> Self {
        Self {
            users,
            hasher: CredentialHasher::new(),
            tokens,
        }
    }

    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `AuthResult<User>` - Created user or error
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - One or more fields rejected
    /// * `AuthError::EmailTaken` - Email already exists
    /// * `AuthError::UsernameTaken` - Username already exists
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        let mut violations = match request.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => field_violations(&errors),
        };
        if !violations.iter().any(|v| v.field == "username")
            && !request
                .username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            violations.push(FieldViolation::new(
                "username",
                "Username can only contain letters, numbers, and underscores",
            ));
        }
        if !violations.is_empty() {
            return Err(AuthError::Validation(violations));
        }

        let username = request.username.to_lowercase();

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hash_password(request.password).await?;

        // A concurrent registration can still win between the checks above
        // and this insert; the store reports that as the same conflict.
        let user = self
            .users
            .create_user(NewUser {
                id: Uuid::new_v4(),
                username,
                email: request.email,
                password_hash,
                created_at: Utc::now(),
            })
            .await?;

        log::info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Login with email and password
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, SessionTokens)> {
        let Some(user) = self.users.find_by_email(&request.email).await? else {
            log::warn!("Login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(request.password, user.password_hash.clone())
            .await?
        {
            log::warn!("Login rejected: wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let subject = user.id.to_string();
        let tokens = SessionTokens {
            access_token: self.tokens.issue_access(&subject)?,
            refresh_token: self.tokens.issue_refresh(&subject)?,
        };

        log::info!("User {} logged in", user.id);
        Ok((user, tokens))
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> AuthResult<String> {
        let token = refresh_token.ok_or(AuthError::RefreshTokenMissing)?;

        let subject = self
            .tokens
            .validate(token, TokenKind::Refresh)
            .map_err(|err| {
                log::debug!("Refresh token rejected: {err}");
                AuthError::InvalidRefreshToken(err)
            })?;

        Ok(self.tokens.issue_access(&subject)?)
    }

    /// Resolve the user behind an access token.
    ///
    /// Every failure, including a subject that no longer exists, collapses to
    /// `Unauthenticated`. Store errors still propagate as such.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<User> {
        let subject = self
            .tokens
            .validate(access_token, TokenKind::Access)
            .map_err(|err| {
                log::debug!("Access token rejected: {err}");
                AuthError::Unauthenticated
            })?;

        let user_id = Uuid::parse_str(&subject).map_err(|_| AuthError::Unauthenticated)?;

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    async fn hash_password(&self, password: String) -> AuthResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::TaskFailed(e.to_string()))?
    }

    async fn verify_password(&self, password: String, hash: String) -> AuthResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::TaskFailed(e.to_string()))
    }
}

/// Flatten validator output into field/message pairs, ordered by field.
fn field_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {field}"));
                FieldViolation::new(field.to_string(), message)
            })
        })
        .collect();
    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

/// Validate a partial profile update.
pub fn check_profile_update(update: &ProfileUpdate) -> AuthResult<()> {
    update
        .validate()
        .map_err(|errors| AuthError::Validation(field_violations(&errors)))
}
