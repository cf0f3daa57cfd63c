//! Connection strategy — pluggable retry policy.
//!
//! The strategy is consulted by the connector after every failed or
//! terminated attempt. It is pure policy: it holds no transport state
//! and performs no I/O.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy for one peer's connection attempts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionStrategy {
    /// Retry immediately after every failure.
    Immediate,
    /// Retry after a constant delay, relative to each failure.
    FixedDelay { delay_ms: u64 },
    /// Double the delay after each consecutive failure, up to a cap.
    ExponentialBackoff { initial_ms: u64, cap_ms: u64 },
    /// Never retry.
    Disabled,
}

impl ConnectionStrategy {
    /// Delay before the next attempt, given the number of consecutive
    /// failures so far (`failures >= 1` after the first failure).
    ///
    /// `None` means no further attempt should be made.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        match self {
            ConnectionStrategy::Immediate => Some(Duration::ZERO),
            ConnectionStrategy::FixedDelay { delay_ms } => {
                Some(Duration::from_millis(*delay_ms))
            }
            ConnectionStrategy::ExponentialBackoff { initial_ms, cap_ms } => {
                // 2^63 already saturates any practical cap.
                let exp = failures.saturating_sub(1).min(63);
                let raw = initial_ms.saturating_mul(1u64.checked_shl(exp).unwrap_or(u64::MAX));
                Some(Duration::from_millis(raw.min(*cap_ms)))
            }
            ConnectionStrategy::Disabled => None,
        }
    }

    /// True if this strategy never attempts connections.
    pub fn is_disabled(&self) -> bool {
        matches!(self, ConnectionStrategy::Disabled)
    }
}

impl Default for ConnectionStrategy {
    fn default() -> Self {
        ConnectionStrategy::ExponentialBackoff {
            initial_ms: 500,
            cap_ms: 30_000,
        }
    }
}
