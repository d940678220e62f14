//! Fixed-point display decimals.
//!
//! Exchange quotes arrive as decimal strings. They are rounded once at the
//! ingestion boundary to a fixed number of fractional digits and carried as
//! `FixedDecimal` from then on, so every consumer renders the same digits.
//! Prices and absolute changes use `PRICE_DECIMALS`, percentages use
//! `PERCENT_DECIMALS`.

use crate::error::{CoreError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fractional digits for prices and absolute price changes.
pub const PRICE_DECIMALS: u32 = 3;

/// Fractional digits for percentage changes.
pub const PERCENT_DECIMALS: u32 = 2;

/// Decimal rounded to an exact number of fractional digits.
///
/// `Display` always prints exactly `scale()` fractional digits, padding with
/// zeros (`100.5` at scale 3 prints `100.500`). A rounded zero never carries
/// a negative sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedDecimal(Decimal);

impl FixedDecimal {
    /// Round `value` to `dp` fractional digits, midpoint away from zero.
    pub fn round(value: Decimal, dp: u32) -> Self {
        let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(dp);
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        Self(rounded)
    }

    /// Zero at the given scale (`0.000` for `dp = 3`).
    pub fn zero(dp: u32) -> Self {
        Self::round(Decimal::ZERO, dp)
    }

    /// Parse a raw exchange value and round it. Never fails: anything that
    /// is not a decimal number becomes zero.
    pub fn parse_lenient(raw: &str, dp: u32) -> Self {
        Self::round(parse_decimal_or_zero(raw), dp)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly below zero. Rounded zeros are never negative.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

/// Parse plain or scientific decimal notation, defaulting to zero.
pub fn parse_decimal_or_zero(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FixedDecimal {
    type Err = rust_decimal::Error;

    /// Strict parse that keeps the scale as written (`"0.20"` stays at scale 2).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl Serialize for FixedDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FixedDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Rounding configuration applied by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    /// Fractional digits for price and absolute change.
    pub price_dp: u32,
    /// Fractional digits for percentage change.
    pub percent_dp: u32,
}

impl Precision {
    /// Upper bound on configurable fractional digits.
    pub const MAX_DP: u32 = 12;

    pub fn new(price_dp: u32, percent_dp: u32) -> Result<Self> {
        if price_dp > Self::MAX_DP || percent_dp > Self::MAX_DP {
            return Err(CoreError::InvalidPrecision(format!(
                "fractional digits must be <= {} (price={price_dp}, percent={percent_dp})",
                Self::MAX_DP
            )));
        }
        Ok(Self {
            price_dp,
            percent_dp,
        })
    }

    /// Round a raw price or absolute change.
    pub fn price(&self, raw: &str) -> FixedDecimal {
        FixedDecimal::parse_lenient(raw, self.price_dp)
    }

    /// Round a raw percentage.
    pub fn percent(&self, raw: &str) -> FixedDecimal {
        FixedDecimal::parse_lenient(raw, self.percent_dp)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            price_dp: PRICE_DECIMALS,
            percent_dp: PERCENT_DECIMALS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_pads_to_scale() {
        assert_eq!(FixedDecimal::round(dec!(100.5), 3).to_string(), "100.500");
        assert_eq!(FixedDecimal::round(dec!(0.2), 2).to_string(), "0.20");
        assert_eq!(FixedDecimal::zero(3).to_string(), "0.000");
    }

    #[test]
    fn test_round_truncates_extra_digits() {
        assert_eq!(
            FixedDecimal::round(dec!(50000.1234), 3).to_string(),
            "50000.123"
        );
        assert_eq!(FixedDecimal::round(dec!(1.2345), 3).to_string(), "1.235");
        assert_eq!(FixedDecimal::round(dec!(-1.2345), 3).to_string(), "-1.235");
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        let rounded = FixedDecimal::round(dec!(-0.001), 2);
        assert_eq!(rounded.to_string(), "0.00");
        assert!(!rounded.is_negative());
        assert!(rounded.is_zero());
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(FixedDecimal::parse_lenient("abc", 3).to_string(), "0.000");
        assert_eq!(FixedDecimal::parse_lenient("", 2).to_string(), "0.00");
        assert_eq!(FixedDecimal::parse_lenient("NaN", 2).to_string(), "0.00");
        assert_eq!(
            FixedDecimal::parse_lenient(" 42.1 ", 3).to_string(),
            "42.100"
        );
        assert_eq!(
            FixedDecimal::parse_lenient("1.5e-3", 3).to_string(),
            "0.002"
        );
    }

    #[test]
    fn test_serialize_as_string() {
        let value = FixedDecimal::round(dec!(3.1), 3);
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"3.100\"");

        let back: FixedDecimal = serde_json::from_str("\"3.100\"").unwrap();
        assert_eq!(back.scale(), 3);
        assert_eq!(back, value);
    }

    #[test]
    fn test_precision_bounds() {
        assert!(Precision::new(3, 2).is_ok());
        assert!(Precision::new(Precision::MAX_DP + 1, 2).is_err());
        assert_eq!(Precision::default(), Precision::new(3, 2).unwrap());
    }
}
