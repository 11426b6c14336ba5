//! # sgate-schema — Schema Registry and Filesystem Source
//!
//! The cache of record for the gateway: logical names map to compiled
//! validators.
//!
//! ## Engine (`engine`)
//!
//! [`ValidationEngine`] wraps the `jsonschema` crate behind the contract
//! `compile(schema) -> CompiledValidator` and
//! `validate(CompiledValidator, payload) -> ok | violations`. External `$ref`
//! URIs resolve only against documents registered with the engine, so a
//! validation never reaches out to the network.
//!
//! ## Registry (`registry`)
//!
//! [`SchemaRegistry`] stores a [`Schema`] only after its document passed
//! schema-level validation and compiled. Entries are swapped atomically:
//! a name maps to a fully compiled schema or is absent.
//!
//! ## Filesystem source (`loader`, `populate`)
//!
//! [`FilesystemLoader`] enumerates a directory of schema files, derives
//! logical names from file stems and deduplicates them (first seen wins).
//! [`populate_from_directory`] drives a full population pass with per-name
//! failure aggregation.
//!
//! ## Crate Policy
//!
//! - No retry or connectivity logic lives here.
//! - Load-time failures are per name and never abort a pass.

pub mod engine;
pub mod loader;
pub mod populate;
pub mod registry;

pub use engine::{CompiledValidator, ValidationEngine};
pub use loader::{Enumeration, FilesystemLoader, LoadFailure, SCHEMA_SUFFIXES};
pub use populate::{populate_from_directory, PopulationReport};
pub use registry::{RegistryDiagnostics, Schema, SchemaRegistry};
