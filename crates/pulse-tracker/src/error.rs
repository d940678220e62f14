//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] pulse_core::CoreError),

    #[error("Feed error: {0}")]
    Feed(#[from] pulse_feed::FeedError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] pulse_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Max reconnection attempts reached ({0})")]
    RetriesExhausted(u32),
}

pub type AppResult<T> = Result<T, AppError>;
