//! REST API server module.
//!
//! Exposes the pulse endpoint services beat against, a status snapshot of
//! every monitored service, and a health check.

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
