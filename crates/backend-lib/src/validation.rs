// ============================
// crates/backend-lib/src/validation.rs
// ============================
//! Registration input validation.

use std::collections::BTreeSet;

use gatekeeper_common::DEFAULT_ROLE;
use thiserror::Error;

use crate::error::AppError;

pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MAX_ROLE_LENGTH: usize = 32;

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Usernames travel inside a Basic credential, so `:` is not allowed.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::InvalidUsername("must not be empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "must be at most {MAX_USERNAME_LENGTH} bytes"
        )));
    }
    if username.contains(':') {
        return Err(ValidationError::InvalidUsername("must not contain ':'".to_string()));
    }
    if username.chars().any(char::is_control) {
        return Err(ValidationError::InvalidUsername(
            "must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Trim and upper-case role labels. No roles at all means [`DEFAULT_ROLE`].
pub fn normalize_roles(roles: Option<&[String]>) -> Result<BTreeSet<String>, ValidationError> {
    let roles = match roles {
        Some(roles) if !roles.is_empty() => roles,
        _ => return Ok(BTreeSet::from([DEFAULT_ROLE.to_string()])),
    };

    roles
        .iter()
        .map(|role| {
            let role = role.trim().to_uppercase();
            if role.is_empty() {
                Err(ValidationError::InvalidRole("must not be empty".to_string()))
            } else if role.len() > MAX_ROLE_LENGTH {
                Err(ValidationError::InvalidRole(format!(
                    "{role} exceeds {MAX_ROLE_LENGTH} bytes"
                )))
            } else if !role.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                Err(ValidationError::InvalidRole(format!("{role} has invalid characters")))
            } else {
                Ok(role)
            }
        })
        .collect()
}
