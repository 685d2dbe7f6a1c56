use async_trait::async_trait;
use gatekeeper_common::User;

use crate::error::AppError;

/// Outcome of an authentication attempt.
///
/// An unknown username and a wrong password both produce `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Authenticated(User),
    Rejected,
}

impl Verdict {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Verdict::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Verdict::Authenticated(user) => Some(user),
            Verdict::Rejected => None,
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Verdict::Authenticated(user) => Some(user),
            Verdict::Rejected => None,
        }
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check a username/password pair against the store
    async fn authenticate(&self, username: &str, plaintext: &str) -> Result<Verdict, AppError>;

    /// Hash the password and persist a new user.
    /// `roles` of `None` or empty grants the default role.
    async fn register(
        &self,
        username: &str,
        plaintext: &str,
        roles: Option<&[String]>,
    ) -> Result<User, AppError>;
}
