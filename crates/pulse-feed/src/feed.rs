//! Ticker feed facade.
//!
//! One `TickerFeed` per stream: it wires the connector to the publisher and
//! exposes the read side. Create as many as needed; there is no global
//! instance.

use crate::error::{FeedError, FeedResult};
use crate::history::{HistoryTrend, DEFAULT_HISTORY_CAPACITY};
use crate::normalizer::Normalizer;
use crate::publisher::{SnapshotObserver, SnapshotPublisher};
use pulse_core::{Precision, PriceRecord, Snapshot, TrackedSymbols};
use pulse_ws::{ConnectionConfig, ConnectionManager, ConnectionState, ConnectionStats};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Symbols tracked when none are configured.
pub const DEFAULT_SYMBOLS: &[&str] = &["BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT"];

/// Feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Tracked symbols in display order.
    pub symbols: Vec<String>,
    pub connection: ConnectionConfig,
    pub history_capacity: usize,
    pub precision: Precision,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            connection: ConnectionConfig::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            precision: Precision::default(),
        }
    }
}

impl FeedConfig {
    /// Check the configuration and build the tracked set.
    pub fn validate(&self) -> FeedResult<TrackedSymbols> {
        if self.history_capacity == 0 {
            return Err(FeedError::InvalidConfig(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.connection.url.trim().is_empty() {
            return Err(FeedError::InvalidConfig("url is empty".to_string()));
        }
        Precision::new(self.precision.price_dp, self.precision.percent_dp)?;
        Ok(TrackedSymbols::new(self.symbols.iter().cloned())?)
    }
}

/// Streaming ticker feed.
pub struct TickerFeed {
    connection: ConnectionManager,
    publisher: Arc<SnapshotPublisher>,
}

impl TickerFeed {
    pub fn new(config: FeedConfig) -> FeedResult<Self> {
        let tracked = config.validate()?;
        info!(
            symbols = ?tracked.as_slice(),
            history_capacity = config.history_capacity,
            url = %config.connection.url,
            "Ticker feed created"
        );

        let publisher = Arc::new(SnapshotPublisher::new(
            tracked,
            Normalizer::new(config.precision),
            config.history_capacity,
        ));

        Ok(Self {
            connection: ConnectionManager::new(config.connection),
            publisher,
        })
    }

    /// Register `observer` and start streaming.
    ///
    /// Calling again while connected only adds a new observer; one already
    /// registered is kept once. Must be called from within a Tokio runtime.
    pub fn connect(&self, observer: Arc<dyn SnapshotObserver>) {
        self.publisher.add_observer(observer);
        self.connection.connect(self.publisher.clone());
    }

    /// Stop streaming and drop all observers.
    pub fn disconnect(&self) {
        self.connection.disconnect();
        self.publisher.clear_observers();
    }

    /// `disconnect()` and wait for the transport to close.
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
        self.publisher.clear_observers();
    }

    pub fn history(&self, symbol: &str) -> Vec<PriceRecord> {
        self.publisher.history(symbol)
    }

    pub fn recent(&self, symbol: &str, n: usize) -> Vec<PriceRecord> {
        self.publisher.recent(symbol, n)
    }

    pub fn trend(&self, symbol: &str) -> Option<HistoryTrend> {
        self.publisher.trend(symbol)
    }

    pub fn latest(&self, symbol: &str) -> Option<PriceRecord> {
        self.publisher.latest(symbol)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.publisher.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.reconnect_attempts()
    }

    pub fn connection_stats(&self) -> &ConnectionStats {
        self.connection.stats()
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    pub fn tracked(&self) -> &TrackedSymbols {
        self.publisher.tracked()
    }
}
