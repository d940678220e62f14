//! Price records and snapshots.
//!
//! These are the only shapes that cross from the ingestion core to
//! presentation layers. Field names serialize in camelCase, decimals as
//! strings.

use crate::decimal::{FixedDecimal, Precision};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current wall-clock time in epoch milliseconds.
#[inline]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// One instrument's state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    /// Exchange symbol (e.g. "BTCUSDT").
    pub symbol: String,
    /// Last price.
    pub price: FixedDecimal,
    /// Absolute change over the exchange's rolling window.
    pub price_change: FixedDecimal,
    /// Percentage change over the exchange's rolling window.
    pub price_change_percent: FixedDecimal,
    /// Event time, epoch milliseconds.
    pub timestamp: i64,
    /// `price_change_percent >= 0`, evaluated on the rounded value.
    pub is_positive: bool,
}

impl PriceRecord {
    /// Create a record. `is_positive` is derived from the rounded percentage
    /// so it always agrees with the displayed sign.
    pub fn new(
        symbol: impl Into<String>,
        price: FixedDecimal,
        price_change: FixedDecimal,
        price_change_percent: FixedDecimal,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            price_change,
            is_positive: !price_change_percent.is_negative(),
            price_change_percent,
            timestamp,
        }
    }

    /// Zero-valued stand-in for a tracked symbol with no data yet.
    ///
    /// Unlike a real zero-change record, a placeholder is never positive.
    pub fn placeholder(symbol: impl Into<String>, precision: Precision, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price: FixedDecimal::zero(precision.price_dp),
            price_change: FixedDecimal::zero(precision.price_dp),
            price_change_percent: FixedDecimal::zero(precision.percent_dp),
            timestamp,
            is_positive: false,
        }
    }
}

/// Ordered latest-known view across all tracked symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Accepted-frame counter, starting at 1 for the first frame.
    pub sequence: u64,
    /// Build time, epoch milliseconds.
    pub emitted_at: i64,
    /// One record per tracked symbol, in tracked order.
    pub records: Vec<PriceRecord>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }

    /// Look up a tracked symbol's record.
    pub fn get(&self, symbol: &str) -> Option<&PriceRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    /// Symbols in snapshot order.
    pub fn symbols(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.symbol.as_str()).collect()
    }
}
