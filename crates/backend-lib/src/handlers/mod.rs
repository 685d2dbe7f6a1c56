// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use gatekeeper_common::{Greeting, RegisterRequest, User};
use zeroize::Zeroizing;

use crate::{error::AppError, AppState};

/// `GET /`: greet the authenticated caller
pub async fn greet(Extension(user): Extension<User>) -> Json<Greeting> {
    Json(Greeting::for_user(&user.username))
}

/// `POST /register`: create a user and return the stored record
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let password = Zeroizing::new(request.password);

    let user = state
        .auth
        .register(&request.username, &password, request.roles.as_deref())
        .await?;
    Ok(Json(user))
}
