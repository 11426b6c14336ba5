//! Reportable health of a schema source.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Health status of the schema source backing a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceHealth {
    /// Source reachable, population complete.
    Healthy,
    /// Calls still flow but some names are unvalidated (retrying, load
    /// failures, names the authority does not know).
    Degraded {
        /// Human-readable reason for the degraded state.
        reason: String,
    },
    /// Source not usable; every call is unvalidated.
    Unavailable {
        /// Human-readable reason for unavailability.
        reason: String,
    },
}

impl SourceHealth {
    /// Whether the source is fully unusable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl fmt::Display for SourceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Degraded { reason } => write!(f, "Degraded: {reason}"),
            Self::Unavailable { reason } => write!(f, "Unavailable: {reason}"),
        }
    }
}
