//! Pulse recording routes.

use axum::{Json, Router, extract::State, routing::post};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{PulseRequest, PulseResponse};
use crate::api::server::AppState;

/// Create the pulse router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(record_pulse))
}

/// Record a pulse for a monitored service.
async fn record_pulse(
    State(state): State<AppState>,
    Json(request): Json<PulseRequest>,
) -> ApiResult<Json<PulseResponse>> {
    if !state.registry.record_pulse(&request.service_name) {
        return Err(ApiError::not_found(format!(
            "unknown service: {}",
            request.service_name
        )));
    }

    debug!(service = %request.service_name, "pulse recorded");
    Ok(Json(PulseResponse {
        service_name: request.service_name,
        recorded: true,
    }))
}
