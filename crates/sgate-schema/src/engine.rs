//! # Validation Engine
//!
//! Thin wrapper over the `jsonschema` crate. The engine is the only place
//! that knows about JSON Schema; the registry sees two operations:
//!
//! - [`ValidationEngine::compile`] — check a document as a schema and
//!   produce a reusable [`CompiledValidator`].
//! - [`ValidationEngine::validate`] — run a payload against a compiled
//!   validator and return every error the engine reports.
//!
//! ## Reference Resolution
//!
//! Cross-schema `$ref` URIs are resolved against documents registered with
//! [`ValidationEngine::register_reference`], keyed by their `$id`. Anything
//! else fails compilation. Validation therefore never blocks on the network.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use parking_lot::RwLock;
use serde_json::Value;
use sgate_core::{Violation, Violations};

/// Resolves `$ref` URIs from the documents registered with the engine.
struct RegisteredRetriever {
    /// Map from `$id` URI to schema value.
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for RegisteredRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }
        // Registered ids may carry a trailing fragment marker.
        if let Some(value) = self.schemas_by_uri.get(&format!("{uri_str}#")) {
            return Ok(value.clone());
        }
        Err(format!("unresolvable schema reference '{uri_str}'").into())
    }
}

/// A compiled, reusable validator for one schema document.
pub struct CompiledValidator {
    inner: Validator,
}

impl CompiledValidator {
    /// Fast boolean check without collecting errors.
    pub fn is_valid(&self, payload: &Value) -> bool {
        self.inner.is_valid(payload)
    }
}

impl fmt::Debug for CompiledValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledValidator").finish_non_exhaustive()
    }
}

/// JSON Schema engine backed by the `jsonschema` crate.
///
/// Cheap to clone; clones share the registered reference documents.
#[derive(Clone, Default)]
pub struct ValidationEngine {
    draft: Option<Draft>,
    references: Arc<RwLock<HashMap<String, Value>>>,
}

impl fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("draft", &self.draft)
            .field("references", &self.references.read().len())
            .finish()
    }
}

impl ValidationEngine {
    /// Engine that detects the draft from each document's `$schema`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine pinned to one draft.
    pub fn with_draft(draft: Draft) -> Self {
        Self {
            draft: Some(draft),
            references: Arc::default(),
        }
    }

    /// Make `document` resolvable by its `$id` from other schemas.
    ///
    /// Returns `false` when the document has no string `$id`.
    pub fn register_reference(&self, document: &Value) -> bool {
        match document.get("$id").and_then(Value::as_str) {
            Some(id) => {
                self.references
                    .write()
                    .insert(id.trim_end_matches('#').to_string(), document.clone());
                true
            }
            None => false,
        }
    }

    /// Check `document` as a schema without keeping the compiled form.
    pub fn check_schema(&self, document: &Value) -> Result<(), Violations> {
        self.compile(document).map(|_| ())
    }

    /// Check `document` as a schema and compile it.
    ///
    /// The document must be a JSON object or boolean and must pass the
    /// engine's meta-schema validation. Errors are returned verbatim.
    pub fn compile(&self, document: &Value) -> Result<CompiledValidator, Violations> {
        if !(document.is_object() || document.is_boolean()) {
            return Err(Violations::new(vec![Violation::root(format!(
                "schema document must be an object or a boolean, found {}",
                json_type_name(document)
            ))]));
        }

        let mut opts = jsonschema::options();
        if let Some(draft) = self.draft {
            opts.with_draft(draft);
        }
        opts.with_retriever(RegisteredRetriever {
            schemas_by_uri: self.references.read().clone(),
        });

        opts.build(document)
            .map(|inner| CompiledValidator { inner })
            .map_err(|e| {
                Violations::new(vec![Violation {
                    instance_path: e.instance_path.to_string(),
                    schema_path: e.schema_path.to_string(),
                    message: e.to_string(),
                }])
            })
    }

    /// Validate `payload`, collecting every error the engine reports.
    pub fn validate(&self, validator: &CompiledValidator, payload: &Value) -> Result<(), Violations> {
        let errors: Vec<Violation> = validator
            .inner
            .iter_errors(payload)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Violations::new(errors))
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
