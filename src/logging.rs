//! Logging initialization.
//!
//! Sets up a `tracing` subscriber with an environment-overridable filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "pulsekeep=info,tower_http=warn";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the default directive. Fails if a subscriber is
/// already installed.
pub fn init() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Other(format!("failed to set global subscriber: {e}")))
}
