//! # sgate-cli — Schema Gateway Command-Line Interface
//!
//! ## Subcommands
//!
//! - `check` — populate a registry from a schema directory and report
//! - `validate` — validate one payload file against a named schema
//! - `serve` — run a standalone gateway with the diagnostics API
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to the library crates and return a process
//!   exit code.

pub mod check;
pub mod serve;
pub mod validate;
