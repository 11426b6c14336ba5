//! # Filesystem Schema Source
//!
//! Reads a directory of individually named schema files. The logical name
//! of each schema is its file name with the recognised suffix stripped:
//! `orderCreated.schema.json` → `orderCreated`.
//!
//! ## Deduplication
//!
//! Entries are visited in file-name order and the first file seen for a
//! derived name wins; later files mapping to the same name are skipped and
//! reported. `a.json` sorts before `a.schema.json`, so the former wins.
//!
//! ## Partial Success
//!
//! A file that cannot be read or parsed fails only its own name. The
//! enumeration carries the successes and the per-name failures side by
//! side.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sgate_core::GatewayError;

/// Recognised schema file suffixes, longest first.
pub const SCHEMA_SUFFIXES: &[&str] = &[
    ".schema.json",
    ".schema.yaml",
    ".schema.yml",
    ".schema",
    ".json",
    ".yaml",
    ".yml",
];

/// A per-name load failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadFailure {
    /// Logical schema name.
    pub name: String,
    /// File the name was derived from.
    pub path: PathBuf,
    /// Why the document could not be used.
    pub reason: String,
}

impl LoadFailure {
    /// Convert into the `SchemaLoadError` taxonomy entry.
    pub fn to_error(&self) -> GatewayError {
        GatewayError::SchemaLoadError {
            name: self.name.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Result of scanning a schema directory.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Successfully parsed `(name, document)` pairs, in file-name order.
    pub documents: Vec<(String, Value)>,
    /// Names whose file could not be read or parsed.
    pub failures: Vec<LoadFailure>,
    /// Files skipped because an earlier file had the same derived name.
    pub duplicates: Vec<PathBuf>,
}

/// Schema source backed by a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemLoader {
    directory: PathBuf,
}

impl FilesystemLoader {
    /// Create a loader for `directory`. The path is resolved on enumeration.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The configured directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolve the configured directory to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::DirectoryNotFound` if the path does not exist
    /// or is not a directory.
    pub fn resolve(&self) -> Result<PathBuf, GatewayError> {
        let not_found = |reason: String| GatewayError::DirectoryNotFound {
            path: self.directory.display().to_string(),
            reason,
        };
        let absolute = std::fs::canonicalize(&self.directory).map_err(|e| not_found(e.to_string()))?;
        if !absolute.is_dir() {
            return Err(not_found("not a directory".to_string()));
        }
        Ok(absolute)
    }

    /// Scan the directory and parse every recognised schema file.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::DirectoryNotFound` if the directory cannot be
    /// resolved or listed. Per-file problems never fail the scan.
    pub fn enumerate(&self) -> Result<Enumeration, GatewayError> {
        let root = self.resolve()?;
        let entries = std::fs::read_dir(&root).map_err(|e| GatewayError::DirectoryNotFound {
            path: root.display().to_string(),
            reason: format!("cannot read schema directory: {e}"),
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() {
                        files.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!(directory = %root.display(), "Skipping unreadable directory entry: {e}");
                }
            }
        }
        files.sort();

        let mut enumeration = Enumeration::default();
        let mut seen: HashSet<String> = HashSet::new();

        for path in files {
            let Some(name) = derive_name(&path) else {
                tracing::debug!(path = %path.display(), "Ignoring non-schema file");
                continue;
            };
            if !seen.insert(name.clone()) {
                tracing::debug!(schema_name = %name, path = %path.display(), "Duplicate schema name, keeping first file");
                enumeration.duplicates.push(path);
                continue;
            }
            match read_document(&path) {
                Ok(document) => enumeration.documents.push((name, document)),
                Err(reason) => {
                    tracing::warn!(schema_name = %name, path = %path.display(), "Schema file failed to parse: {reason}");
                    enumeration.failures.push(LoadFailure { name, path, reason });
                }
            }
        }

        tracing::debug!(
            directory = %root.display(),
            parsed = enumeration.documents.len(),
            failed = enumeration.failures.len(),
            duplicates = enumeration.duplicates.len(),
            "Schema directory enumerated"
        );
        Ok(enumeration)
    }

    /// Read a single schema file.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::FileNotFound` if `path` is not an existing
    /// file, or `GatewayError::SchemaLoadError` if its name cannot be
    /// derived or its content cannot be parsed.
    pub fn read_file(path: &Path) -> Result<(String, Value), GatewayError> {
        if !path.is_file() {
            return Err(GatewayError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let name = derive_name(path).ok_or_else(|| GatewayError::SchemaLoadError {
            name: path.display().to_string(),
            reason: format!("unrecognised schema file extension (expected one of {SCHEMA_SUFFIXES:?})"),
        })?;
        let document = read_document(path).map_err(|reason| GatewayError::SchemaLoadError {
            name: name.clone(),
            reason,
        })?;
        Ok((name, document))
    }
}

/// Derive the logical name from a file path by stripping the longest
/// recognised suffix. Hidden files and unrecognised extensions yield `None`.
pub fn derive_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('.') {
        return None;
    }
    SCHEMA_SUFFIXES.iter().find_map(|suffix| {
        file_name
            .strip_suffix(suffix)
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
    })
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn read_document(path: &Path) -> Result<Value, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read file: {e}"))?;
    if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(|e| format!("invalid YAML: {e}"))
    } else {
        serde_json::from_str(&content).map_err(|e| format!("invalid JSON: {e}"))
    }
}
