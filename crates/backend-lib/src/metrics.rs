// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const AUTH_AUTHENTICATED: &str = "auth.authenticated";
pub const AUTH_REJECTED: &str = "auth.rejected";
pub const AUTH_LOCKED_OUT: &str = "auth.locked_out";
pub const USER_REGISTERED: &str = "user.registered";
pub const USER_DUPLICATE: &str = "user.duplicate";
