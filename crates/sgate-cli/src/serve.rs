//! # Serve Subcommand
//!
//! `sgate serve` runs a standalone gateway and the diagnostics API.
//!
//! Configuration comes from `--config <FILE>` (YAML, the serde form of
//! `GatewayConfig`) or, without it, from the `SGATE_*` environment. The
//! hosted service is a stand-in that declares each `--name` as an action;
//! for a remote source those are the names fetched from the authority.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use sgate_api::AppState;
use sgate_core::GatewayConfig;
use sgate_gate::{LocalHost, SchemaGateway};

/// Arguments for the `sgate serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Gateway configuration file (YAML). Defaults to the environment.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen address for the diagnostics API.
    #[arg(long, env = "SGATE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Call or event name the hosted service declares. Repeatable.
    #[arg(long = "name")]
    pub names: Vec<String>,
}

/// Load configuration from a YAML file, or from the environment.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            serde_yaml::from_str::<GatewayConfig>(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => GatewayConfig::from_env().context("invalid SGATE_* environment")?,
    };
    config.validate()?;
    Ok(config)
}

/// Build the stand-in host service.
pub fn stand_in_host(names: &[String]) -> LocalHost {
    names.iter().fold(LocalHost::new("sgate"), |host, name| {
        host.action(name.clone(), |payload: &Value| payload.clone())
    })
}

/// Execute the serve subcommand.
pub fn run_serve(args: &ServeArgs) -> Result<u8> {
    let config = load_config(args.config.as_deref())?;
    let runtime = tokio::runtime::Runtime::new().context("cannot start tokio runtime")?;
    runtime.block_on(serve(config, args))?;
    Ok(0)
}

async fn serve(config: GatewayConfig, args: &ServeArgs) -> Result<()> {
    let mut host = stand_in_host(&args.names);
    let gateway = Arc::new(SchemaGateway::start(config, &mut host)?);
    if let Some(e) = gateway.startup_error() {
        tracing::warn!("Serving in degraded mode: {e}");
    }

    let app = sgate_api::app(AppState::new(Arc::clone(&gateway)));
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("cannot bind {}", args.bind))?;
    tracing::info!("sgate listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    gateway.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
