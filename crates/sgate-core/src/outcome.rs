//! # Validation Outcome
//!
//! The tri-state result of validating a payload against the registry.
//! "No schema" and "payload invalid" are distinct variants because they
//! carry different default policies: a rejected payload blocks an action
//! call, an unvalidated one proceeds with a warning unless configured
//! otherwise.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::violation::Violations;

/// Why a payload could not be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnvalidatedReason {
    /// The registry has been populated but holds no schema for the name.
    MissingSchema,
    /// No population pass has completed yet (source unavailable or still
    /// connecting).
    RegistryNotPopulated,
}

impl UnvalidatedReason {
    /// Returns the canonical reason string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSchema => "missing-schema",
            Self::RegistryNotPopulated => "registry-not-populated",
        }
    }
}

impl fmt::Display for UnvalidatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `validate_payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The payload satisfies the registered schema.
    Accepted,
    /// The payload fails the registered schema. Errors are the engine's,
    /// unmodified.
    Rejected(Violations),
    /// No validation took place.
    Unvalidated(UnvalidatedReason),
}

impl ValidationOutcome {
    /// Whether the payload was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether the payload was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Whether no validation took place.
    pub fn is_unvalidated(&self) -> bool {
        matches!(self, Self::Unvalidated(_))
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected(_) => "rejected",
            Self::Unvalidated(_) => "unvalidated",
        }
    }
}
