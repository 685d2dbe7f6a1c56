// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the Gatekeeper HTTP server.

pub mod basic_auth;

pub use basic_auth::{client_ip, require_basic_auth};
