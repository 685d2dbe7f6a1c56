use std::sync::Arc;

use async_trait::async_trait;
use gatekeeper_common::User;
use metrics::counter;
use zeroize::Zeroizing;

use super::{AuthService, PasswordEncoder, PasswordRequirements, Verdict};
use crate::error::AppError;
use crate::metrics::{AUTH_AUTHENTICATED, AUTH_REJECTED, USER_DUPLICATE, USER_REGISTERED};
use crate::storage::CredentialStore;
use crate::validation;

/// Store-backed authentication: the only place that touches secrets.
pub struct AuthenticationCore {
    store: Arc<dyn CredentialStore>,
    encoder: PasswordEncoder,
    requirements: PasswordRequirements,
    /// Verified against when the username is unknown, so a miss costs as
    /// much as a wrong password. Made with the configured algorithm: after
    /// an algorithm switch only hashes still in the old format cost
    /// differently, and each is upgraded on its next successful login.
    decoy_hash: String,
}

impl AuthenticationCore {
    /// Build the core. Hashes one random decoy secret up front.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        encoder: PasswordEncoder,
        requirements: PasswordRequirements,
    ) -> Result<Self, AppError> {
        let decoy: [u8; 32] = rand::random();
        let decoy_hash = encoder.hash(&format!("{decoy:02x?}"))?;
        Ok(Self {
            store,
            encoder,
            requirements,
            decoy_hash,
        })
    }

    pub fn encoder(&self) -> &PasswordEncoder {
        &self.encoder
    }

    /// Hash a plaintext password (blocking; see [`PasswordEncoder::hash`])
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        self.encoder.hash(plaintext)
    }

    /// Verify a plaintext password against a stored hash (blocking)
    pub fn verify(&self, plaintext: &str, password_hash: &str) -> Result<bool, AppError> {
        self.encoder.verify(plaintext, password_hash)
    }

    async fn hash_blocking(&self, plaintext: &str) -> Result<String, AppError> {
        let encoder = self.encoder.clone();
        let plaintext = Zeroizing::new(plaintext.to_owned());
        tokio::task::spawn_blocking(move || encoder.hash(&plaintext)).await?
    }

    /// Re-hash with the configured algorithm and costs if the stored hash
    /// predates them. A failed upgrade never fails the login.
    async fn upgrade_hash(&self, user: User, plaintext: &str) -> User {
        match self.encoder.needs_rehash(&user.password_hash) {
            Ok(true) => {},
            _ => return user,
        }

        let upgraded = async {
            let password_hash = self.hash_blocking(plaintext).await?;
            self.store
                .save(User {
                    password_hash,
                    ..user.clone()
                })
                .await
        };

        match upgraded.await {
            Ok(saved) => {
                tracing::info!(username = %saved.username, "password hash upgraded");
                saved
            },
            Err(e) => {
                tracing::warn!(username = %user.username, error = %e, "password hash upgrade failed");
                user
            },
        }
    }

    async fn verify_blocking(&self, plaintext: &str, password_hash: String) -> Result<bool, AppError> {
        let encoder = self.encoder.clone();
        let plaintext = Zeroizing::new(plaintext.to_owned());
        tokio::task::spawn_blocking(move || encoder.verify(&plaintext, &password_hash)).await?
    }
}

#[async_trait]
impl AuthService for AuthenticationCore {
    async fn authenticate(&self, username: &str, plaintext: &str) -> Result<Verdict, AppError> {
        let user = self.store.find_by_username(username).await?;
        let stored_hash = user
            .as_ref()
            .map_or_else(|| self.decoy_hash.clone(), |u| u.password_hash.clone());

        // CorruptHash is logged once, where it becomes a response
        let matched = self.verify_blocking(plaintext, stored_hash).await?;

        match user {
            Some(user) if matched => {
                counter!(AUTH_AUTHENTICATED).increment(1);
                tracing::debug!(%username, "authenticated");
                Ok(Verdict::Authenticated(self.upgrade_hash(user, plaintext).await))
            },
            _ => {
                counter!(AUTH_REJECTED).increment(1);
                tracing::debug!(%username, "authentication rejected");
                Ok(Verdict::Rejected)
            },
        }
    }

    async fn register(
        &self,
        username: &str,
        plaintext: &str,
        roles: Option<&[String]>,
    ) -> Result<User, AppError> {
        validation::validate_username(username)?;
        let roles = validation::normalize_roles(roles)?;
        self.requirements
            .check(plaintext)
            .map_err(AppError::InvalidInput)?;

        // Skip the slow hash for an obvious duplicate; `create` still
        // settles concurrent registrations.
        if self.store.find_by_username(username).await?.is_some() {
            counter!(USER_DUPLICATE).increment(1);
            return Err(AppError::DuplicateUsername(username.to_string()));
        }

        let password_hash = self.hash_blocking(plaintext).await?;
        let user = match self.store.create(User::new(username, password_hash, roles)).await {
            Ok(user) => user,
            Err(e) => {
                if matches!(e, AppError::DuplicateUsername(_)) {
                    counter!(USER_DUPLICATE).increment(1);
                }
                return Err(e);
            },
        };

        counter!(USER_REGISTERED).increment(1);
        tracing::info!(%username, id = ?user.id, roles = ?user.roles, "registered user");
        Ok(user)
    }
}
