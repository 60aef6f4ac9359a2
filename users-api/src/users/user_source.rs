use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::users::user_models::{Role, UpdateUser, User, ValidNewUser};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("User not found")]
    NotFound(u64),
    #[error("Name and email are required")]
    MissingFields,
    #[error("User database unavailable")]
    Unavailable,
}

/// The source of truth for users.
#[async_trait]
pub trait UserSource {
    async fn list(&self) -> Result<Vec<User>, UserError>;
    async fn get(&self, id: u64) -> Result<User, UserError>;
    async fn create(&self, new_user: ValidNewUser) -> Result<User, UserError>;
    async fn update(&self, id: u64, update: UpdateUser) -> Result<User, UserError>;
    async fn delete(&self, id: u64) -> Result<User, UserError>;
}

/// Simulated user database: an in-memory table with artificial latency on every call.
#[derive(Clone)]
pub struct InMemoryUserSource {
    users: Arc<RwLock<BTreeMap<u64, User>>>,
    next_id: Arc<AtomicU64>,
    latency: Duration,
    available: Arc<AtomicBool>,
    queries: Arc<AtomicU64>,
}

impl InMemoryUserSource {
    pub fn with_users(latency: Duration, users: Vec<User>) -> Self {
        let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        Self {
            users: Arc::new(RwLock::new(users.into_iter().map(|u| (u.id, u)).collect())),
            next_id: Arc::new(AtomicU64::new(next_id)),
            latency,
            available: Arc::new(AtomicBool::new(true)),
            queries: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Seeded with the three demo users.
    pub fn seeded(latency: Duration) -> Self {
        Self::with_users(latency, seed_users())
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// How many calls reached the table.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Acquire)
    }

    async fn query(&self) -> Result<(), UserError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.available.load(Ordering::Acquire) {
            return Err(UserError::Unavailable);
        }
        self.queries.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

pub fn seed_users() -> Vec<User> {
    let user = |id, name: &str, email: &str, role| User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role,
        created_at: None,
    };
    vec![
        user(1, "John Doe", "john@example.com", Role::Admin),
        user(2, "Jane Smith", "jane@example.com", Role::User),
        user(3, "Bob Johnson", "bob@example.com", Role::User),
    ]
}

#[async_trait]
impl UserSource for InMemoryUserSource {
    async fn list(&self) -> Result<Vec<User>, UserError> {
        self.query().await?;
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<User, UserError> {
        self.query().await?;
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(UserError::NotFound(id))
    }

    async fn create(&self, new_user: ValidNewUser) -> Result<User, UserError> {
        self.query().await?;
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::AcqRel),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            created_at: Some(Utc::now()),
        };
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: u64, update: UpdateUser) -> Result<User, UserError> {
        self.query().await?;
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(UserError::NotFound(id))?;
        update.apply(user);
        Ok(user.clone())
    }

    async fn delete(&self, id: u64) -> Result<User, UserError> {
        self.query().await?;
        self.users
            .write()
            .await
            .remove(&id)
            .ok_or(UserError::NotFound(id))
    }
}
