//! Service status routes.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::models::StatusResponse;
use crate::api::server::AppState;

/// Create the status router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(service_status))
}

/// Snapshot of every monitored service.
async fn service_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        services: state.registry.status_snapshot(),
    })
}
