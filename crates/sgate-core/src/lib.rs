//! # sgate-core — Foundational Types for the Schema Gateway
//!
//! Every other `sgate-*` crate depends on this one; it depends on nothing
//! internal. It holds the vocabulary shared by the registry, the schema
//! sources, the connection supervisor and the interception gates.
//!
//! ## Contents
//!
//! - [`GatewayError`] — the typed failure taxonomy consumed by the host
//!   framework's error-reporting path.
//! - [`Violation`] / [`Violations`] — engine-produced validation errors,
//!   carried verbatim from the engine to the caller.
//! - [`ValidationOutcome`] — the tri-state result of validating a payload
//!   (`Accepted`, `Rejected`, `Unvalidated`).
//! - [`ConnectionState`] / [`RetryBudget`] — state owned by one connection
//!   supervisor instance. There is no process-wide retry counter.
//! - [`SourceHealth`] — reportable health of a schema source.
//! - [`GatewayConfig`] — configuration surface consumed by the gateway.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sgate-*` crates.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod outcome;
pub mod violation;

pub use config::{ConfigError, GatePolicy, GatewayConfig, MissingSchemaPolicy, SourceConfig};
pub use connection::{ConnectionState, RetryBudget};
pub use error::{ErrorDetail, GatewayError};
pub use health::SourceHealth;
pub use outcome::{UnvalidatedReason, ValidationOutcome};
pub use violation::{Violation, Violations};
