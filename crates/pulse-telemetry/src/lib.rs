//! Prometheus metrics and structured logging for pulse.
//!
//! - Structured logging with tracing, pretty in development, JSON in production
//! - Prometheus metrics for connection state, frames and snapshots

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
