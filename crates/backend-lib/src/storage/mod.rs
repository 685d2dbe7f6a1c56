// ============================
// backend-lib/src/storage/mod.rs
// ============================
//! Credential storage: a username-keyed map of [`User`] records.
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use gatekeeper_common::User;

use crate::config::{StorageBackend, StorageSettings};
use crate::error::AppError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Trait for user stores.
///
/// Lookups are case-sensitive exact matches. Writes are visible to every
/// reader as soon as the call returns.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a user; `Ok(None)` when the username is unknown
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Insert or overwrite the record keyed by `user.username`.
    /// Overwrites keep the existing id.
    async fn save(&self, user: User) -> Result<User, AppError>;

    /// Insert only if the username is free, else [`AppError::DuplicateUsername`]
    async fn create(&self, user: User) -> Result<User, AppError>;

    /// Number of stored users
    async fn count(&self) -> Result<usize, AppError>;
}

/// Open the backend named in the settings
pub async fn open_store(settings: &StorageSettings) -> Result<Arc<dyn CredentialStore>, AppError> {
    match settings.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Sqlite => {
            let url = settings.database_url.as_deref().ok_or_else(|| {
                AppError::InvalidInput("storage.database_url is not set".to_string())
            })?;
            Ok(Arc::new(SqliteStore::connect(url).await?))
        },
    }
}
