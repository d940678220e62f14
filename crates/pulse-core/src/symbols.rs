//! Tracked instrument allowlist.
//!
//! The tracked set is fixed at startup. Its order is the canonical order of
//! every snapshot, and membership is the filter for history retention.

use crate::error::{CoreError, Result};
use std::collections::HashSet;

/// Ordered, immutable set of tracked symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSymbols {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl TrackedSymbols {
    /// Build the tracked set.
    ///
    /// Rejects an empty list, blank symbols and duplicates. Symbols are kept
    /// exactly as given (exchange symbols are case-sensitive).
    pub fn new<I, S>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut members = HashSet::new();

        for symbol in symbols {
            let symbol: String = symbol.into();
            if symbol.trim().is_empty() || symbol.trim() != symbol {
                return Err(CoreError::InvalidSymbol(format!("{symbol:?}")));
            }
            if !members.insert(symbol.clone()) {
                return Err(CoreError::DuplicateSymbol(symbol));
            }
            ordered.push(symbol);
        }

        if ordered.is_empty() {
            return Err(CoreError::InvalidConfig(
                "tracked symbol list is empty".to_string(),
            ));
        }

        Ok(Self { ordered, members })
    }

    /// Filter predicate.
    #[inline]
    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.members.contains(symbol)
    }

    /// Symbols in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    /// Position of a symbol in canonical order.
    pub fn position(&self, symbol: &str) -> Option<usize> {
        if !self.is_tracked(symbol) {
            return None;
        }
        self.ordered.iter().position(|s| s == symbol)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
