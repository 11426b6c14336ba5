//! # Check Subcommand
//!
//! `sgate check --dir <DIR>` runs one population pass over a schema
//! directory and prints the report as JSON. Exit code 1 when any schema
//! failed to parse or is not a valid schema.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sgate_schema::{populate_from_directory, PopulationReport, SchemaRegistry};

/// Arguments for the `sgate check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema directory.
    #[arg(long, env = "SGATE_SCHEMA_DIR")]
    pub dir: PathBuf,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    directory: String,
    clean: bool,
    #[serde(flatten)]
    report: &'a PopulationReport,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let registry = SchemaRegistry::default();
    let report = populate_from_directory(&registry, &args.dir)
        .with_context(|| format!("cannot check {}", args.dir.display()))?;

    let output = CheckOutput {
        directory: args.dir.display().to_string(),
        clean: report.is_clean(),
        report: &report,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    for error in report.errors() {
        tracing::warn!(code = error.code(), "{error}");
    }
    Ok(if report.is_clean() { 0 } else { 1 })
}
