//! Raw tick normalisation.

use pulse_core::{now_ms, FixedDecimal, Precision, PriceRecord};
use pulse_ws::RawTick;

/// Maps raw ticks to rounded `PriceRecord`s.
///
/// Normalisation is total. Missing or non-numeric values become zero and a
/// missing event time becomes the normalisation instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    precision: Precision,
}

impl Normalizer {
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn normalize(&self, raw: &RawTick) -> PriceRecord {
        self.normalize_at(raw, now_ms())
    }

    /// Normalise with `now` as the fallback timestamp.
    pub fn normalize_at(&self, raw: &RawTick, now: i64) -> PriceRecord {
        PriceRecord::new(
            raw.symbol().unwrap_or_default(),
            self.price(raw.last_price.as_deref()),
            self.price(raw.price_change.as_deref()),
            self.percent(raw.price_change_percent.as_deref()),
            raw.event_time.unwrap_or(now),
        )
    }

    fn price(&self, raw: Option<&str>) -> FixedDecimal {
        self.precision.price(raw.unwrap_or_default())
    }

    fn percent(&self, raw: Option<&str>) -> FixedDecimal {
        self.precision.percent(raw.unwrap_or_default())
    }
}
