//! Ticker frame model.
//!
//! The all-market ticker stream sends one JSON array per frame, one object
//! per instrument:
//!
//! ```json
//! [{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","p":"100.5","P":"0.2","c":"50000.1234", ...}]
//! ```
//!
//! Only `s`, `c`, `p`, `P` and `E` are read; everything else is ignored.
//! Fields are optional and type-lenient: a number where a string is
//! expected is kept as its decimal text, anything else is treated as absent.
//! Defaulting happens later, in the normalizer.

use crate::error::WsResult;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// One raw instrument entry from a ticker frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTick {
    /// Symbol (`s`).
    #[serde(rename = "s", default, deserialize_with = "lenient_text")]
    pub symbol: Option<String>,
    /// Last price (`c`).
    #[serde(rename = "c", default, deserialize_with = "lenient_text")]
    pub last_price: Option<String>,
    /// Absolute price change (`p`).
    #[serde(rename = "p", default, deserialize_with = "lenient_text")]
    pub price_change: Option<String>,
    /// Percentage price change (`P`).
    #[serde(rename = "P", default, deserialize_with = "lenient_text")]
    pub price_change_percent: Option<String>,
    /// Event time in epoch milliseconds (`E`).
    #[serde(rename = "E", default, deserialize_with = "lenient_millis")]
    pub event_time: Option<i64>,
}

impl RawTick {
    /// Symbol, if present and non-empty.
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref().filter(|s| !s.is_empty())
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Parse one text frame.
///
/// - invalid JSON: `Err`, the caller drops the frame and keeps the connection
/// - valid JSON that is not an array (control replies): `Ok(None)`
/// - array: `Ok(Some(ticks))`, skipping items that are not objects
pub fn parse_frame(text: &str) -> WsResult<Option<Vec<RawTick>>> {
    let value: Value = serde_json::from_str(text)?;

    let Value::Array(items) = value else {
        debug!("Ignoring non-array frame");
        return Ok(None);
    };

    let mut ticks = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            debug!(?item, "Skipping non-object ticker entry");
            continue;
        }
        match serde_json::from_value::<RawTick>(item) {
            Ok(tick) => ticks.push(tick),
            Err(e) => debug!(error = %e, "Skipping unreadable ticker entry"),
        }
    }

    Ok(Some(ticks))
}
