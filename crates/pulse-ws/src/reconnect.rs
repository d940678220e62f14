//! Reconnection policy.
//!
//! Linear backoff: the k-th consecutive retry waits `base_delay * k`. After
//! `max_attempts` retries without a successful open the policy is exhausted
//! and the connector stops for good.

use std::time::Duration;

/// Linear backoff with a retry ceiling.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_delay_ms: u64,
    max_attempts: u32,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based), or `None` past the ceiling.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(Duration::from_millis(
            self.base_delay_ms.saturating_mul(u64::from(attempt)),
        ))
    }

    /// Count one more retry and return its delay.
    ///
    /// The counter is incremented first, so the first retry waits
    /// `base_delay * 1`. Returns `None` once the ceiling is reached; the
    /// counter then stays at `max_attempts`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        self.delay_for(self.attempt)
    }

    /// Forget previous failures (called on a successful open).
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Retries counted since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
