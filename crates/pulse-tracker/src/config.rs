//! Application configuration.

use crate::error::{AppError, AppResult};
use pulse_core::{Precision, TrackedSymbols, PERCENT_DECIMALS, PRICE_DECIMALS};
use pulse_feed::{FeedConfig, DEFAULT_HISTORY_CAPACITY, DEFAULT_SYMBOLS};
use pulse_ws::{ConnectionConfig, DEFAULT_TICKER_URL};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file used when neither `--config` nor `PULSE_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PULSE_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ticker stream URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Tracked symbols, in display order.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_ws_url() -> String {
    DEFAULT_TICKER_URL.to_string()
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            symbols: default_symbols(),
            websocket: WebSocketConfig::default(),
            feed: FeedSettings::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Reconnect behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Retries after a close before giving up. Default: 5.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Linear backoff base (ms). Default: 1000.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
        }
    }
}

/// History and rounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Records kept per tracked symbol. Default: 50.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
    #[serde(default = "default_percent_decimals")]
    pub percent_decimals: u32,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_price_decimals() -> u32 {
    PRICE_DECIMALS
}

fn default_percent_decimals() -> u32 {
    PERCENT_DECIMALS
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            price_decimals: default_price_decimals(),
            percent_decimals: default_percent_decimals(),
        }
    }
}

/// Logging and statistics output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default tracing directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds between statistics summaries. Default: 60.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_log_level() -> String {
    "info,pulse=debug".to_string()
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Load from `PULSE_CONFIG`, falling back to `config/default.toml`.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_from(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject configurations the feed cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.ws_url.trim().is_empty() {
            return Err(AppError::Config("ws_url is empty".to_string()));
        }
        TrackedSymbols::new(self.symbols.iter().cloned())?;
        if self.feed.history_capacity == 0 {
            return Err(AppError::Config(
                "feed.history_capacity must be at least 1".to_string(),
            ));
        }
        self.precision()?;
        if self.telemetry.stats_interval_secs == 0 {
            return Err(AppError::Config(
                "telemetry.stats_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn precision(&self) -> AppResult<Precision> {
        Ok(Precision::new(
            self.feed.price_decimals,
            self.feed.percent_decimals,
        )?)
    }

    /// Build the feed configuration.
    pub fn feed_config(&self) -> AppResult<FeedConfig> {
        Ok(FeedConfig {
            symbols: self.symbols.clone(),
            connection: ConnectionConfig {
                url: self.ws_url.clone(),
                max_reconnect_attempts: self.websocket.max_reconnect_attempts,
                reconnect_base_delay_ms: self.websocket.reconnect_base_delay_ms,
            },
            history_capacity: self.feed.history_capacity,
            precision: self.precision()?,
        })
    }
}
