// ============================
// backend-lib/src/lib.rs
// ============================
//! Core functionality for the Gatekeeper HTTP Basic authentication server.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthRateLimiter, AuthService, AuthenticationCore, PasswordEncoder};
use crate::config::{SeedUser, Settings};
use crate::error::AppError;
use crate::storage::CredentialStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// User store behind the authentication service
    pub store: Arc<dyn CredentialStore>,
    /// Settings
    pub settings: Arc<Settings>,
    /// Failed-login lockout
    pub rate_limiter: Arc<AuthRateLimiter>,
}

impl AppState {
    /// Wire the authentication core over a store
    pub fn new(store: Arc<dyn CredentialStore>, settings: Settings) -> Result<Self, AppError> {
        let encoder = PasswordEncoder::from_settings(&settings.hashing)?;
        let auth = Arc::new(AuthenticationCore::new(
            Arc::clone(&store),
            encoder,
            settings.password_requirements.clone(),
        )?);
        let rate_limiter = Arc::new(AuthRateLimiter::from_settings(&settings.rate_limit));

        // Spawn the lockout cleanup task when a runtime is available
        if tokio::runtime::Handle::try_current().is_ok() {
            let every = Duration::from_secs(settings.rate_limit.cleanup_interval_secs);
            rate_limiter.spawn_cleanup(every);
        }

        Ok(Self {
            auth,
            store,
            settings: Arc::new(settings),
            rate_limiter,
        })
    }

    /// Open the configured store and wire the state over it
    pub async fn from_settings(settings: Settings) -> Result<Self, AppError> {
        let store = storage::open_store(&settings.storage).await?;
        Self::new(store, settings)
    }

    /// Register the configured seed users if the store is empty.
    /// Returns how many users were created.
    pub async fn seed_users(&self) -> Result<usize, AppError> {
        seed_users(self.auth.as_ref(), self.store.as_ref(), &self.settings.seed_users).await
    }
}

/// Register bootstrap accounts into an empty store
pub async fn seed_users(
    auth: &dyn AuthService,
    store: &dyn CredentialStore,
    seeds: &[SeedUser],
) -> Result<usize, AppError> {
    if seeds.is_empty() || store.count().await? > 0 {
        return Ok(0);
    }

    for seed in seeds {
        auth.register(&seed.username, &seed.password, Some(seed.roles.as_slice()))
            .await?;
    }
    tracing::info!(count = seeds.len(), "seeded bootstrap users");
    Ok(seeds.len())
}
