//! API route modules.

pub mod health;
pub mod pulse;
pub mod status;

use axum::{Router, middleware as axum_middleware};

use crate::api::middleware::bearer_auth;
use crate::api::server::AppState;

/// Create the main API router with all routes.
///
/// The pulse and status endpoints sit behind bearer authentication; the
/// health endpoint stays open for load balancer probes.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/api/v1/pulse", pulse::router())
        .nest("/api/v1/status", status::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            bearer_auth,
        ));

    Router::new()
        .nest("/health", health::router())
        .merge(protected)
        .with_state(state)
}
