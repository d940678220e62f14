//! Per-symbol price history.
//!
//! Each tracked symbol gets a bounded FIFO of its most recent records.
//! Records stay in arrival order and are never re-sorted, so an
//! out-of-order event time from the exchange is kept where it arrived.

use pulse_core::{FixedDecimal, PriceRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Records retained per symbol.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Records shown by a price chart.
pub const CHART_WINDOW: usize = 10;

/// Bounded FIFO of one symbol's records.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    records: VecDeque<PriceRecord>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append, evicting the oldest record when full.
    pub fn push(&mut self, record: PriceRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Copy of all records, oldest first.
    pub fn to_vec(&self) -> Vec<PriceRecord> {
        self.records.iter().cloned().collect()
    }

    /// Copy of the last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<PriceRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&PriceRecord> {
        self.records.back()
    }

    /// Change between the two most recent records, rounded to `percent_dp`.
    pub fn trend(&self, percent_dp: u32) -> Option<HistoryTrend> {
        let len = self.records.len();
        if len < 2 {
            return None;
        }
        HistoryTrend::between(&self.records[len - 2], &self.records[len - 1], percent_dp)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Price movement between two consecutive records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTrend {
    pub previous: FixedDecimal,
    pub current: FixedDecimal,
    /// `(current - previous) / previous * 100`, at percent precision.
    pub change_pct: FixedDecimal,
}

impl HistoryTrend {
    /// `None` when the previous price is zero or the change overflows.
    pub fn between(
        previous: &PriceRecord,
        current: &PriceRecord,
        percent_dp: u32,
    ) -> Option<Self> {
        if previous.price.is_zero() {
            return None;
        }
        let prev = previous.price.inner();
        let change = current
            .price
            .inner()
            .checked_sub(prev)?
            .checked_div(prev)?
            .checked_mul(Decimal::ONE_HUNDRED)?;

        Some(Self {
            previous: previous.price,
            current: current.price,
            change_pct: FixedDecimal::round(change, percent_dp),
        })
    }

    pub fn is_up(&self) -> bool {
        !self.change_pct.is_negative()
    }
}

/// History buffers keyed by symbol.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    percent_dp: u32,
    buffers: HashMap<String, HistoryBuffer>,
}

impl HistoryStore {
    pub fn new(capacity: usize, percent_dp: u32) -> Self {
        Self {
            capacity,
            percent_dp,
            buffers: HashMap::new(),
        }
    }

    /// Append a record to its symbol's buffer, creating it on first use.
    pub fn append(&mut self, record: PriceRecord) {
        let capacity = self.capacity;
        self.buffers
            .entry(record.symbol.clone())
            .or_insert_with(|| HistoryBuffer::new(capacity))
            .push(record);
    }

    /// Oldest-first copy; empty for a symbol never seen.
    pub fn get(&self, symbol: &str) -> Vec<PriceRecord> {
        self.buffers
            .get(symbol)
            .map(HistoryBuffer::to_vec)
            .unwrap_or_default()
    }

    pub fn recent(&self, symbol: &str, n: usize) -> Vec<PriceRecord> {
        self.buffers
            .get(symbol)
            .map(|b| b.recent(n))
            .unwrap_or_default()
    }

    pub fn trend(&self, symbol: &str) -> Option<HistoryTrend> {
        self.buffers
            .get(symbol)
            .and_then(|b| b.trend(self.percent_dp))
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.buffers.get(symbol).map_or(0, HistoryBuffer::len)
    }

    /// Number of symbols with at least one record.
    pub fn symbol_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
