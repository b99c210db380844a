//! pulsekeep library crate.
//!
//! Tracks the liveness of named external services through periodic pulse
//! signals and raises notifications over pluggable channels when a service
//! misses its expected pulse.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod registry;
pub mod util;

pub use error::{DeliveryFailures, Error, Result, SendFailure};
