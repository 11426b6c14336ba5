//! # sgate CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sgate_cli::check::{run_check, CheckArgs};
use sgate_cli::serve::{run_serve, ServeArgs};
use sgate_cli::validate::{run_validate, ValidateArgs};

/// Schema gateway toolchain.
///
/// Checks schema directories, validates payloads against named schemas, and
/// runs a standalone gateway with its diagnostics API.
#[derive(Parser, Debug)]
#[command(name = "sgate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load every schema in a directory and report failures.
    Check(CheckArgs),

    /// Validate a payload file against a named schema.
    Validate(ValidateArgs),

    /// Run the gateway and its diagnostics API.
    Serve(ServeArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = match &cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Serve(args) => run_serve(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
