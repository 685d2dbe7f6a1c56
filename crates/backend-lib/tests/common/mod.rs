//! Shared setup for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
};
use backend_lib::auth::Credentials;
use backend_lib::config::{Argon2Settings, HashAlgorithm, HashingSettings, ScryptSettings, Settings};
use backend_lib::storage::{CredentialStore, MemoryStore};
use backend_lib::AppState;
use zeroize::Zeroizing;

/// Default settings with hashing cheap enough for tests
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.hashing = HashingSettings {
        algorithm: HashAlgorithm::Scrypt,
        scrypt: ScryptSettings { log_n: 10, r: 8, p: 1 },
        argon2: Argon2Settings {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
    };
    settings
}

pub fn memory_state(settings: Settings) -> AppState {
    let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::new());
    AppState::new(store, settings).expect("state")
}

pub fn basic(username: &str, password: &str) -> String {
    Credentials {
        username: username.to_string(),
        password: Zeroizing::new(password.to_string()),
    }
    .to_header_value()
}

pub fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, authorization: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
