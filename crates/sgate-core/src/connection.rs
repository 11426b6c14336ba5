//! # Connection State and Retry Budget
//!
//! Connectivity state for the remote schema authority. Both types are owned
//! by exactly one connection supervisor instance, so independent gateways
//! (and tests) never share a retry counter.
//!
//! ## States
//!
//! DISCONNECTED → CONNECTING → CONNECTED
//!                    ↓
//!               DISCONNECTED (retry scheduled) → … → EXHAUSTED (terminal)

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connectivity state of a supervised schema source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No connection, no attempt in flight.
    Disconnected,
    /// A liveness probe is in flight.
    Connecting,
    /// The authority answered the probe.
    Connected,
    /// The retry budget is spent. Terminal until a manual restart.
    Exhausted,
}

impl ConnectionState {
    /// Returns the canonical state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Exhausted => "EXHAUSTED",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bounded retry budget for connectivity attempts.
///
/// `attempts_made` increments once per failed attempt. Once it reaches
/// `retry_threshold` the budget is exhausted and no further attempt may be
/// scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    attempts_made: u32,
    retry_threshold: u32,
    retry_timeout: Duration,
}

impl RetryBudget {
    /// Create a fresh budget. A threshold of zero is treated as one: the
    /// initial attempt always runs.
    pub fn new(retry_threshold: u32, retry_timeout: Duration) -> Self {
        Self {
            attempts_made: 0,
            retry_threshold: retry_threshold.max(1),
            retry_timeout,
        }
    }

    /// Record a failed attempt. Returns `true` if the budget is now exhausted.
    pub fn record_failure(&mut self) -> bool {
        self.attempts_made = self.attempts_made.saturating_add(1);
        self.is_exhausted()
    }

    /// Whether `attempts_made >= retry_threshold`.
    pub fn is_exhausted(&self) -> bool {
        self.attempts_made >= self.retry_threshold
    }

    /// Reset the failure counter (manual restart).
    pub fn reset(&mut self) {
        self.attempts_made = 0;
    }

    /// Failed attempts so far.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Maximum number of failed attempts.
    pub fn retry_threshold(&self) -> u32 {
        self.retry_threshold
    }

    /// Delay between attempts.
    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }
}
