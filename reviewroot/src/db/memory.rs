//! In-process user store.
//!
//! Backs the test suites and `--in-memory` development runs. A single write
//! lock covers the uniqueness check and the insert, which gives the same
//! all-or-nothing behaviour as the database's unique constraints.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::UserRepository;
use crate::auth::{AuthError, AuthResult, NewUser, ProfileUpdate, User, UserId};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(AuthError::UsernameTaken);
        }

        let stored = User {
            id: user.id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            avatar: None,
            bio: None,
            followers: Vec::new(),
            following: Vec::new(),
            created_at: user.created_at,
        };
        users.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> AuthResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(None);
        };

        if let Some(bio) = &update.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(avatar) = &update.avatar {
            user.avatar = Some(avatar.clone());
        }

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, user_id: UserId) -> AuthResult<bool> {
        Ok(self.users.write().await.remove(&user_id).is_some())
    }

    async fn list_users_except(&self, user_id: UserId) -> AuthResult<Vec<User>> {
        let users = self.users.read().await;
        let mut others: Vec<User> = users
            .values()
            .filter(|u| u.id != user_id)
            .cloned()
            .collect();
        others.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });

        Ok(others)
    }

    async fn health_check(&self) -> AuthResult<()> {
        Ok(())
    }
}
