//! Core domain types for the pulse ticker feed.
//!
//! This crate provides the types shared by every other crate:
//! - `PriceRecord`: one instrument's normalized state at one point in time
//! - `Snapshot`: the ordered, latest-known view across tracked symbols
//! - `FixedDecimal`, `Precision`: fixed-point display rounding
//! - `TrackedSymbols`: the ordered allowlist of instruments

pub mod decimal;
pub mod error;
pub mod symbols;
pub mod types;

pub use decimal::{FixedDecimal, Precision, PERCENT_DECIMALS, PRICE_DECIMALS};
pub use error::{CoreError, Result};
pub use symbols::TrackedSymbols;
pub use types::{now_ms, PriceRecord, Snapshot};
