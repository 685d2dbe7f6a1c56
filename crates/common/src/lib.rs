// ================
// common/src/lib.rs
// ================
//! Common types shared between the Gatekeeper server and its clients.
//! These are the JSON shapes of the HTTP API and the persisted user record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Role granted when a registration does not name any.
pub const DEFAULT_ROLE: &str = "USER";

/// A registered principal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned identifier, `None` until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Unique, case-sensitive login name
    pub username: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    /// Role labels granted to the principal
    pub roles: BTreeSet<String>,
}

impl User {
    /// Build an unsaved user record.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, roles: BTreeSet<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            password_hash: password_hash.into(),
            roles,
        }
    }

    /// Whether the user carries the given role label.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Body of `POST /register`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Optional role labels; defaults to [`DEFAULT_ROLE`]
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// Body of `GET /`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Greeting {
    pub message: String,
    /// Fresh per request; the server keeps no session state
    pub request_id: Uuid,
}

impl Greeting {
    pub fn for_user(username: &str) -> Self {
        Self {
            message: format!("Welcome {username}"),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
