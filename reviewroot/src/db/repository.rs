//! Repository trait definitions for testability and dependency injection.
//!
//! The user store is reached only through [`UserRepository`], so the HTTP
//! layer and the auth manager hold an injected handle instead of a global
//! client. Uniqueness of email and username is the store's job: both
//! implementations reject a duplicate atomically on insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::auth::{AuthError, AuthResult, NewUser, ProfileUpdate, User, UserId};

/// Constraint guarding unique usernames.
pub const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Constraint guarding unique emails.
pub const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `EmailTaken` or `UsernameTaken` when
    /// either value is already in use.
    async fn create_user(&self, user: NewUser) -> AuthResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Apply the fields present in `update`, returning the stored result.
    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> AuthResult<Option<User>>;

    /// Remove a user; `false` if no such user existed.
    async fn delete_user(&self, user_id: UserId) -> AuthResult<bool>;

    /// Every user except `user_id`, oldest first.
    async fn list_users_except(&self, user_id: UserId) -> AuthResult<Vec<User>>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> AuthResult<()>;
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, avatar, bio, followers, following, created_at";

/// Default PostgreSQL implementation of `UserRepository`
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(r: &PgRow) -> User {
    User {
        id: r.get::<Uuid, _>("id"),
        username: r.get("username"),
        email: r.get("email"),
        password_hash: r.get("password_hash"),
        avatar: r.get("avatar"),
        bio: r.get("bio"),
        followers: r.get::<Vec<Uuid>, _>("followers"),
        following: r.get::<Vec<Uuid>, _>("following"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
    }
}

/// Translate a unique-constraint violation into the matching conflict.
fn map_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => return AuthError::EmailTaken,
                Some(USERNAME_CONSTRAINT) => return AuthError::UsernameTaken,
                _ => {}
            }
        }
    }
    AuthError::Database(err)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(user_from_row(&row))
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users
             SET bio = COALESCE($2, bio), avatar = COALESCE($3, avatar)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&update.bio)
        .bind(&update.avatar)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn delete_user(&self, user_id: UserId) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users_except(&self, user_id: UserId) -> AuthResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id <> $1 ORDER BY created_at, username"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn health_check(&self) -> AuthResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
