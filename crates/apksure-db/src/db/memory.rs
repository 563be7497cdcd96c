//! In-memory user store

use apksure_core::{normalize_email, AppError, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::user::UserStore;

/// `UserStore` keyed by normalized email. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryUserStore {
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
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&normalize_email(email)).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: String) -> Result<User, AppError> {
        let email = normalize_email(email);
        let mut users = self.users.write().await;
        if users.contains_key(&email) {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(email, user.clone());
        Ok(user)
    }
}
