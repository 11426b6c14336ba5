//! # Schema Registry
//!
//! Maps logical names to compiled validators.
//!
//! ## Consistency
//!
//! Entries are `Arc<Schema>` values in a sharded [`DashMap`]. A schema is
//! compiled before it is inserted, and a reload swaps the `Arc` in one
//! insert, so a reader sees either the old entry or the new one, never a
//! compiled validator paired with another document. Writes to one name do
//! not block reads of unrelated names. Every name is an independent unit of
//! consistency; no operation spans several entries.
//!
//! ## Side Effects
//!
//! Only [`SchemaRegistry::load`], [`SchemaRegistry::remove`],
//! [`SchemaRegistry::clear`] and the failure/population bookkeeping mutate
//! the registry. `lookup`, `list` and `validate_payload` are pure reads.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sgate_core::{GatewayError, UnvalidatedReason, ValidationOutcome};

use crate::engine::{CompiledValidator, ValidationEngine};

/// A registered schema: document plus its compiled validator.
#[derive(Debug)]
pub struct Schema {
    name: String,
    document: Value,
    compiled: CompiledValidator,
    digest: String,
    loaded_at: DateTime<Utc>,
}

impl Schema {
    /// Logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw schema document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Engine-produced validator.
    pub fn compiled(&self) -> &CompiledValidator {
        &self.compiled
    }

    /// Lowercase hex SHA-256 of the serialized document.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// When this entry was stored.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Snapshot of registry state for operational introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryDiagnostics {
    /// Whether a population pass has completed.
    pub populated: bool,
    /// Loaded schema names, sorted.
    pub loaded: Vec<String>,
    /// Number of names whose last load failed.
    pub load_failures: usize,
    /// Failure reason per name.
    pub failures: BTreeMap<String, String>,
}

/// Concurrent cache of compiled schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    engine: ValidationEngine,
    entries: DashMap<String, Arc<Schema>>,
    failures: DashMap<String, String>,
    populated: AtomicBool,
}

impl SchemaRegistry {
    /// Create an empty registry using the given engine.
    pub fn new(engine: ValidationEngine) -> Self {
        Self {
            engine,
            entries: DashMap::new(),
            failures: DashMap::new(),
            populated: AtomicBool::new(false),
        }
    }

    /// The engine used to compile and run schemas.
    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// Validate `document` as a schema, compile it and store it under
    /// `name`, replacing any prior entry.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::SchemaInvalid` with the engine's errors if the
    /// document is not a valid schema. The registry is left untouched.
    pub fn load(&self, name: &str, document: Value) -> Result<Arc<Schema>, GatewayError> {
        let compiled = self.engine.compile(&document).map_err(|violations| {
            tracing::warn!(schema_name = %name, errors = violations.len(), "Schema failed schema-level validation");
            GatewayError::SchemaInvalid {
                name: name.to_string(),
                violations,
            }
        })?;

        self.engine.register_reference(&document);
        let schema = Arc::new(Schema {
            name: name.to_string(),
            digest: document_digest(&document),
            document,
            compiled,
            loaded_at: Utc::now(),
        });

        match self.entries.insert(name.to_string(), Arc::clone(&schema)) {
            Some(previous) if previous.digest == schema.digest => {
                tracing::debug!(schema_name = %name, "Schema reloaded unchanged");
            }
            Some(_) => tracing::info!(schema_name = %name, digest = %schema.digest, "Schema replaced"),
            None => tracing::debug!(schema_name = %name, digest = %schema.digest, "Schema loaded"),
        }
        self.failures.remove(name);
        Ok(schema)
    }

    /// Look up a schema by logical name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Schema>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// All registered schemas, in no particular order.
    pub fn list(&self) -> Vec<Arc<Schema>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Registered names, sorted alphabetically.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no schemas.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate `payload` against the schema registered under `name`.
    ///
    /// Rejections carry the engine's error list unmodified.
    pub fn validate_payload(&self, name: &str, payload: &Value) -> ValidationOutcome {
        let Some(schema) = self.lookup(name) else {
            return ValidationOutcome::Unvalidated(if self.is_populated() {
                UnvalidatedReason::MissingSchema
            } else {
                UnvalidatedReason::RegistryNotPopulated
            });
        };

        match self.engine.validate(&schema.compiled, payload) {
            Ok(()) => ValidationOutcome::Accepted,
            Err(violations) => ValidationOutcome::Rejected(violations),
        }
    }

    /// Invalidate one entry and forget its failure record.
    pub fn remove(&self, name: &str) -> Option<Arc<Schema>> {
        self.failures.remove(name);
        self.entries.remove(name).map(|(_, schema)| schema)
    }

    /// Drop every entry and failure record. Population state is kept.
    pub fn clear(&self) {
        self.entries.clear();
        self.failures.clear();
    }

    /// Record that the last load attempt for `name` failed.
    pub fn record_failure(&self, name: &str, reason: impl Into<String>) {
        self.failures.insert(name.to_string(), reason.into());
    }

    /// Number of names whose last load failed.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Mark that a population pass has completed.
    pub fn mark_populated(&self) {
        self.populated.store(true, Ordering::Release);
    }

    /// Whether any population pass has completed.
    pub fn is_populated(&self) -> bool {
        self.populated.load(Ordering::Acquire)
    }

    /// Snapshot for diagnostics.
    pub fn diagnostics(&self) -> RegistryDiagnostics {
        let failures: BTreeMap<String, String> = self
            .failures
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        RegistryDiagnostics {
            populated: self.is_populated(),
            loaded: self.names(),
            load_failures: failures.len(),
            failures,
        }
    }
}

fn document_digest(document: &Value) -> String {
    // serde_json::Value objects serialize with sorted keys (no
    // preserve_order), so equal documents hash equally.
    let bytes = serde_json::to_vec(document).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}
