//! # Directory Population Pass
//!
//! Drives one full load of a schema directory into a registry. Parse
//! failures and schema-level failures are reported in separate lists, both
//! are recorded on the registry per name, and neither aborts the pass.

use std::path::Path;

use serde::Serialize;
use sgate_core::{GatewayError, Violations};

use crate::loader::{FilesystemLoader, LoadFailure};
use crate::registry::SchemaRegistry;

/// A document that parsed but failed schema-level validation.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidSchema {
    /// Logical schema name.
    pub name: String,
    /// Engine errors, verbatim.
    pub violations: Violations,
}

/// Outcome of one population pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulationReport {
    /// Names loaded into the registry.
    pub loaded: Vec<String>,
    /// Names whose file could not be read or parsed.
    pub parse_failures: Vec<LoadFailure>,
    /// Names whose document is not a valid schema.
    pub invalid: Vec<InvalidSchema>,
    /// Files skipped as duplicates of an earlier name.
    pub duplicates: Vec<String>,
}

impl PopulationReport {
    /// Whether every discovered schema loaded.
    pub fn is_clean(&self) -> bool {
        self.parse_failures.is_empty() && self.invalid.is_empty()
    }

    /// Total number of per-name failures.
    pub fn failure_count(&self) -> usize {
        self.parse_failures.len() + self.invalid.len()
    }

    /// All per-name failures as taxonomy errors.
    pub fn errors(&self) -> Vec<GatewayError> {
        self.parse_failures
            .iter()
            .map(LoadFailure::to_error)
            .chain(self.invalid.iter().map(|i| GatewayError::SchemaInvalid {
                name: i.name.clone(),
                violations: i.violations.clone(),
            }))
            .collect()
    }
}

/// Load every schema in `directory` into `registry`.
///
/// Marks the registry populated once the pass completes, even when some
/// names failed.
///
/// # Errors
///
/// Returns `GatewayError::DirectoryNotFound` when the directory cannot be
/// resolved or listed. The registry is left untouched in that case.
pub fn populate_from_directory(
    registry: &SchemaRegistry,
    directory: &Path,
) -> Result<PopulationReport, GatewayError> {
    let enumeration = FilesystemLoader::new(directory).enumerate()?;

    let mut report = PopulationReport {
        duplicates: enumeration
            .duplicates
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        ..PopulationReport::default()
    };

    for failure in enumeration.failures {
        registry.record_failure(&failure.name, failure.reason.clone());
        report.parse_failures.push(failure);
    }

    for (name, document) in enumeration.documents {
        match registry.load(&name, document) {
            Ok(_) => report.loaded.push(name),
            Err(GatewayError::SchemaInvalid { name, violations }) => {
                registry.record_failure(&name, format!("invalid schema: {violations}"));
                report.invalid.push(InvalidSchema { name, violations });
            }
            Err(other) => {
                registry.record_failure(&name, other.to_string());
                report.invalid.push(InvalidSchema {
                    name,
                    violations: Violations::default(),
                });
            }
        }
    }

    registry.mark_populated();
    tracing::info!(
        directory = %directory.display(),
        loaded = report.loaded.len(),
        failed = report.failure_count(),
        "Schema population pass complete"
    );
    Ok(report)
}
