//! In-memory user store.
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gatekeeper_common::User;

use super::CredentialStore;
use crate::error::AppError;

/// `DashMap`-backed store. Each username maps to one shard, so writers for
/// different users do not contend and a write is visible to the next read.
#[derive(Debug)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn save(&self, mut user: User) -> Result<User, AppError> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(mut existing) => {
                user.id = existing.get().id;
                existing.insert(user.clone());
            },
            Entry::Vacant(slot) => {
                user.id = Some(self.allocate_id());
                slot.insert(user.clone());
            },
        }
        Ok(user)
    }

    async fn create(&self, mut user: User) -> Result<User, AppError> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateUsername(user.username)),
            Entry::Vacant(slot) => {
                user.id = Some(self.allocate_id());
                slot.insert(user.clone());
                Ok(user)
            },
        }
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.users.len())
    }
}
