//! Route modules.

pub mod health;
pub mod metrics;

use axum::Router;

use crate::api::server::AppState;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(metrics::router())
        .nest("/health", health::router())
        .with_state(state)
}
