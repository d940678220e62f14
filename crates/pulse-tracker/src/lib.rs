//! Live crypto ticker tracker.
//!
//! Wires the pulse ingestion core into a long-running process:
//! - TOML configuration with defaults
//! - Ticker feed with reconnect handling
//! - Metrics and periodic statistics logging

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, TrackerObserver};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
