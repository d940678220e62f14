//! Prometheus metrics for the pulse tracker.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means a duplicate metric
//! name, which is a startup bug; it can only happen during static
//! initialization.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_gauge, register_gauge_vec, register_int_counter,
    register_int_gauge, Counter, Encoder, Gauge, GaugeVec, IntCounter, IntGauge, TextEncoder,
};

/// Connector states exported as `pulse_ws_state` labels.
const WS_STATES: &[&str] = &[
    "disconnected",
    "connecting",
    "connected",
    "reconnecting",
    "max_retries_exhausted",
];

/// WebSocket connection state (1 = connected, 0 = otherwise).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "pulse_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Connector state machine current state.
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "pulse_ws_state",
        "Connector state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnect attempts scheduled.
pub static WS_RECONNECT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "pulse_ws_reconnect_total",
        "Total WebSocket reconnection attempts"
    )
    .unwrap()
});

/// Text frames received.
pub static FRAMES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pulse_frames_received_total",
        "Ticker frames received"
    )
    .unwrap()
});

/// Frames dropped as malformed.
pub static FRAMES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pulse_frames_dropped_total",
        "Ticker frames dropped as malformed JSON"
    )
    .unwrap()
});

/// Snapshots published.
pub static SNAPSHOTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("pulse_snapshots_total", "Snapshots published").unwrap()
});

/// Tracked symbols with at least one record.
pub static TRACKED_WITH_DATA: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pulse_tracked_symbols_with_data",
        "Tracked symbols that have received data"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the connector state. Only the active state is 1.
    pub fn ws_state_set(state: &str) {
        for &s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
        WS_CONNECTED.set(if state == "connected" { 1.0 } else { 0.0 });
    }

    pub fn ws_reconnect() {
        WS_RECONNECT_TOTAL.inc();
    }

    /// Bring frame counters up to the connector's running totals.
    ///
    /// Counters only move forward, so totals lower than the exported value
    /// are ignored.
    pub fn frames_sync(received: u64, dropped: u64) {
        let received_delta = received.saturating_sub(FRAMES_RECEIVED_TOTAL.get());
        FRAMES_RECEIVED_TOTAL.inc_by(received_delta);
        let dropped_delta = dropped.saturating_sub(FRAMES_DROPPED_TOTAL.get());
        FRAMES_DROPPED_TOTAL.inc_by(dropped_delta);
    }

    pub fn snapshot_published(tracked_with_data: usize) {
        SNAPSHOTS_TOTAL.inc();
        TRACKED_WITH_DATA.set(tracked_with_data as i64);
    }

    /// Encode the default registry in the text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
