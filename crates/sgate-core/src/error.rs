//! # Error Taxonomy
//!
//! Typed failure signals consumed by the host framework's error-reporting
//! path.
//!
//! ## Scoping
//!
//! - Load-time errors (`SchemaLoadError`, `SchemaInvalid`) are scoped to one
//!   schema name and aggregated by the population pass. They never abort
//!   the whole pass.
//! - Source errors (`DirectoryNotFound`, `FileNotFound`) are fatal to one
//!   load attempt, never to the process.
//! - `ConnectivityExhausted` is a persistent degraded-mode condition.
//! - Call-time errors (`PayloadRejected`, `MissingSchema`) surface
//!   synchronously to the action gate's caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::violation::{Violation, Violations};

/// Errors raised by the schema gateway.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// The schema directory does not exist or is not a directory.
    #[error("schema directory not found: {path}: {reason}")]
    DirectoryNotFound {
        /// Path as configured.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// A single schema file does not exist.
    #[error("schema file not found: {path}")]
    FileNotFound {
        /// Path as requested.
        path: String,
    },

    /// A schema document could not be read or parsed.
    #[error("schema load error for '{name}': {reason}")]
    SchemaLoadError {
        /// Logical schema name.
        name: String,
        /// Reason the document could not be loaded.
        reason: String,
    },

    /// A document failed schema-level validation. The name is never
    /// registered.
    #[error("schema '{name}' is not a valid schema:\n{violations}")]
    SchemaInvalid {
        /// Logical schema name.
        name: String,
        /// Engine errors, verbatim.
        violations: Violations,
    },

    /// The remote authority stayed unreachable for the whole retry budget.
    #[error("schema authority {endpoint} unreachable after {attempts} attempts")]
    ConnectivityExhausted {
        /// Authority endpoint.
        endpoint: String,
        /// Failed attempts made.
        attempts: u32,
    },

    /// A payload failed validation against its registered schema.
    #[error("payload for '{name}' rejected:\n{violations}")]
    PayloadRejected {
        /// Logical name of the call or event.
        name: String,
        /// Engine errors, verbatim.
        violations: Violations,
    },

    /// No schema is registered for the name.
    #[error("no schema registered for '{name}'")]
    MissingSchema {
        /// Logical name of the call or event.
        name: String,
    },
}

impl GatewayError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DirectoryNotFound { .. } => "DIRECTORY_NOT_FOUND",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::SchemaLoadError { .. } => "SCHEMA_LOAD_ERROR",
            Self::SchemaInvalid { .. } => "SCHEMA_INVALID",
            Self::ConnectivityExhausted { .. } => "CONNECTIVITY_EXHAUSTED",
            Self::PayloadRejected { .. } => "PAYLOAD_REJECTED",
            Self::MissingSchema { .. } => "MISSING_SCHEMA",
        }
    }

    /// Whether this error refuses an inbound action call.
    pub fn blocks_call(&self) -> bool {
        matches!(self, Self::PayloadRejected { .. } | Self::MissingSchema { .. })
    }

    /// The logical schema name this error is scoped to, if any.
    pub fn schema_name(&self) -> Option<&str> {
        match self {
            Self::SchemaLoadError { name, .. }
            | Self::SchemaInvalid { name, .. }
            | Self::PayloadRejected { name, .. }
            | Self::MissingSchema { name } => Some(name),
            _ => None,
        }
    }

    /// Structured engine errors carried by this error, if any.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::SchemaInvalid { violations, .. } | Self::PayloadRejected { violations, .. } => {
                violations.violations()
            }
            _ => &[],
        }
    }

    /// Render a serializable error detail for the host's error path.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
            name: self.schema_name().map(str::to_string),
            errors: self.violations().to_vec(),
        }
    }
}

/// Serializable form of a [`GatewayError`] handed to the host framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Logical name involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Engine errors, verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Violation>,
}
