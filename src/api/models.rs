//! API request and response models.

use serde::{Deserialize, Serialize};

use crate::registry::ServiceStatus;

/// Pulse submission body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PulseRequest {
    pub service_name: String,
}

/// Pulse acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseResponse {
    pub service_name: String,
    pub recorded: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Status snapshot of every monitored service.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub services: Vec<ServiceStatus>,
}
