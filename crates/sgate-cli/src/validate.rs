//! # Validate Subcommand
//!
//! `sgate validate --dir <DIR> --name <NAME> --payload <FILE>` validates one
//! payload against the schema registered under `NAME` and prints the
//! outcome as JSON. Payload files ending in `.yaml`/`.yml` are read as YAML,
//! anything else as JSON.
//!
//! Exit codes: 0 accepted or unvalidated, 1 rejected, 2 unvalidated with
//! `--strict`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use sgate_core::ValidationOutcome;
use sgate_schema::{populate_from_directory, SchemaRegistry};

/// Arguments for the `sgate validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema directory.
    #[arg(long, env = "SGATE_SCHEMA_DIR")]
    pub dir: PathBuf,

    /// Logical call or event name.
    #[arg(long)]
    pub name: String,

    /// Payload file.
    #[arg(long)]
    pub payload: PathBuf,

    /// Fail when no schema is registered for the name.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    name: &'a str,
    #[serde(flatten)]
    outcome: &'a ValidationOutcome,
}

fn read_payload(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read payload {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let payload = if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("invalid YAML payload {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON payload {}", path.display()))?
    };
    Ok(payload)
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let registry = SchemaRegistry::default();
    let report = populate_from_directory(&registry, &args.dir)
        .with_context(|| format!("cannot load schemas from {}", args.dir.display()))?;
    if !report.is_clean() {
        tracing::warn!(
            failures = report.failure_count(),
            "Some schemas failed to load; their names validate as unvalidated"
        );
    }

    let payload = read_payload(&args.payload)?;
    let outcome = registry.validate_payload(&args.name, &payload);
    let output = ValidateOutput {
        name: &args.name,
        outcome: &outcome,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(match outcome {
        ValidationOutcome::Accepted => 0,
        ValidationOutcome::Rejected(_) => 1,
        ValidationOutcome::Unvalidated(_) if args.strict => 2,
        ValidationOutcome::Unvalidated(_) => 0,
    })
}
