//! Application orchestration.
//!
//! Starts the ticker feed, records metrics for every snapshot and state
//! change, logs a periodic summary and shuts the feed down on Ctrl-C.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use pulse_core::Snapshot;
use pulse_feed::{SnapshotObserver, TickerFeed};
use pulse_telemetry::Metrics;
use pulse_ws::ConnectionState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

/// Snapshot observer that feeds state changes back to the main loop.
pub struct TrackerObserver {
    states: mpsc::UnboundedSender<ConnectionState>,
}

impl TrackerObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConnectionState>) {
        let (states, rx) = mpsc::unbounded_channel();
        (Self { states }, rx)
    }
}

impl SnapshotObserver for TrackerObserver {
    fn on_snapshot(&self, snapshot: &Snapshot) {
        debug!(
            sequence = snapshot.sequence,
            symbols = snapshot.len(),
            "Snapshot received"
        );
    }

    fn on_state_change(&self, state: ConnectionState) {
        Metrics::ws_state_set(state.as_str());
        if state == ConnectionState::Reconnecting {
            Metrics::ws_reconnect();
        }
        // Receiver gone means the app is shutting down.
        let _ = self.states.send(state);
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    feed: TickerFeed,
    snapshot_count: u64,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let feed = TickerFeed::new(config.feed_config()?)?;

        Ok(Self {
            config,
            feed,
            snapshot_count: 0,
        })
    }

    pub fn feed(&self) -> &TickerFeed {
        &self.feed
    }

    /// Run until Ctrl-C or until the connector gives up.
    pub async fn run(mut self) -> AppResult<()> {
        info!(
            url = %self.config.ws_url,
            symbols = ?self.config.symbols,
            "Starting application"
        );

        let mut snapshots = self.feed.subscribe();
        let (observer, mut states) = TrackerObserver::channel();
        self.feed.connect(Arc::new(observer));

        let mut stats_interval = tokio::time::interval(Duration::from_secs(
            self.config.telemetry.stats_interval_secs,
        ));
        // First tick completes immediately.
        stats_interval.tick().await;

        let mut outcome = Ok(());

        info!("Entering main event loop");
        loop {
            tokio::select! {
                result = snapshots.recv() => {
                    match result {
                        Ok(snapshot) => self.handle_snapshot(&snapshot),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "Snapshot receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }

                Some(state) = states.recv() => {
                    info!(%state, "Connection state changed");
                    if state == ConnectionState::MaxRetriesExhausted {
                        let attempts = self.feed.reconnect_attempts();
                        error!(attempts, "Feed stopped, giving up");
                        outcome = Err(AppError::RetriesExhausted(attempts));
                        break;
                    }
                }

                _ = stats_interval.tick() => {
                    info!("Outputting periodic statistics summary");
                    self.log_stats();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(snapshots = self.snapshot_count, "Shutting down");
        self.feed.shutdown().await;

        info!("Final statistics summary:");
        self.log_stats();

        outcome
    }

    fn handle_snapshot(&mut self, snapshot: &Snapshot) {
        self.snapshot_count += 1;
        trace!(sequence = snapshot.sequence, "Snapshot applied");
        Metrics::snapshot_published(self.feed.publisher().tracked_with_data());
    }

    fn log_stats(&self) {
        let stats = self.feed.connection_stats();
        Metrics::frames_sync(stats.frames_received(), stats.frames_dropped());

        info!(
            state = %self.feed.state(),
            snapshots = self.snapshot_count,
            frames_received = stats.frames_received(),
            frames_dropped = stats.frames_dropped(),
            reconnects = stats.reconnect_attempts(),
            connections_opened = stats.connections_opened(),
            "Feed statistics"
        );

        for record in self.feed.snapshot().iter() {
            let trend = self.feed.trend(&record.symbol);
            info!(
                symbol = %record.symbol,
                price = %record.price,
                change = %record.price_change,
                change_pct = %record.price_change_percent,
                up = record.is_positive,
                last_move_pct = ?trend.map(|t| t.change_pct.to_string()),
                history = self.feed.history(&record.symbol).len(),
                "Ticker"
            );
        }
    }
}
