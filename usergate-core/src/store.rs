//! User storage
//!
//! Handlers talk to a [`UserStore`]; the only implementation shipped here
//! keeps users in memory for the lifetime of the process.

use crate::error::{Result, UsergateError};
use crate::types::{NewUser, User, UserId, UserPatch};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// CRUD operations behind the five user routes
pub trait UserStore: Send + Sync {
    /// All users, ordered by id
    fn list(&self) -> Vec<User>;

    /// Validate and store a new user
    fn create(&self, new_user: NewUser) -> Result<User>;

    /// Look up one user
    fn get(&self, id: &UserId) -> Result<User>;

    /// Validate and apply a partial update
    fn update(&self, id: &UserId, patch: UserPatch) -> Result<User>;

    /// Remove a user, returning what was removed
    fn delete(&self, id: &UserId) -> Result<User>;

    /// Number of stored users
    fn len(&self) -> usize;

    /// True when no users are stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concurrent in-memory store with sequential numeric ids
#[derive(Debug)]
pub struct InMemoryUserStore {
    users: DashMap<UserId, User>,
    next_id: AtomicU64,
}

impl InMemoryUserStore {
    /// Create an empty store; the first id handed out is `1`
    pub fn new() -> Self {
        InMemoryUserStore {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate_id(&self) -> UserId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        UserId::new(id.to_string())
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_key(id: &UserId) -> (u64, String) {
    // Numeric ids sort numerically; anything else sorts after them.
    match id.as_str().parse::<u64>() {
        Ok(n) => (n, String::new()),
        Err(_) => (u64::MAX, id.as_str().to_string()),
    }
}

impl UserStore for InMemoryUserStore {
    fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by_cached_key(|u| sort_key(&u.id));
        users
    }

    fn create(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        let now = Utc::now();
        let id = self.allocate_id();

        let user = User {
            id: id.clone(),
            name: new_user.name.trim().to_string(),
            email: new_user.email.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, user.clone());
        debug!("Created user {}", user.id);
        Ok(user)
    }

    fn get(&self, id: &UserId) -> Result<User> {
        self.users
            .get(id)
            .map(|e| e.value().clone())
            .ok_or_else(|| UsergateError::UserNotFound(id.clone()))
    }

    fn update(&self, id: &UserId, patch: UserPatch) -> Result<User> {
        patch.validate()?;

        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| UsergateError::UserNotFound(id.clone()))?;
        patch.apply(entry.value_mut(), Utc::now());
        debug!("Updated user {}", id);
        Ok(entry.value().clone())
    }

    fn delete(&self, id: &UserId) -> Result<User> {
        let (_, user) = self
            .users
            .remove(id)
            .ok_or_else(|| UsergateError::UserNotFound(id.clone()))?;
        debug!("Deleted user {}", id);
        Ok(user)
    }

    fn len(&self) -> usize {
        self.users.len()
    }
}
