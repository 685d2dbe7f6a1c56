// ============================
// backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod basic;
pub mod password;
pub mod rate_limit;
mod service;
mod service_impl;

pub use basic::{parse_basic_authorization, Credentials};
pub use password::{validate_password_strength, PasswordEncoder, PasswordRequirements};
pub use rate_limit::AuthRateLimiter;
pub use service::{AuthService, Verdict};
pub use service_impl::AuthenticationCore;
