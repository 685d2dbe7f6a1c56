// ============================
// backend-lib/src/router.rs
// ============================
//! HTTP routes.
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{greet, register};
use crate::middleware::require_basic_auth;
use crate::AppState;

/// Build the application router.
///
/// Every route sits behind Basic authentication, except `/register` when
/// `open_registration` is enabled.
pub fn create_router(state: AppState) -> Router {
    let register_route = Router::new().route("/register", post(register));

    let (protected, public) = if state.settings.open_registration {
        (Router::new().route("/", get(greet)), register_route)
    } else {
        (
            Router::new().route("/", get(greet)).merge(register_route),
            Router::new(),
        )
    };

    protected
        .route_layer(middleware::from_fn_with_state(state.clone(), require_basic_auth))
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
