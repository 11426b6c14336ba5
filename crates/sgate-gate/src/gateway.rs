//! # Gateway Bootstrap
//!
//! [`SchemaGateway`] wires one schema source, one registry and the two gates
//! into a host service:
//!
//! 1. build the registry and gates,
//! 2. install the action hook and event wrapper into the host,
//! 3. populate the registry from the configured source.
//!
//! A filesystem source is populated synchronously; a missing directory is
//! logged and kept as the startup error, and the registry stays unpopulated
//! (every call is `Unvalidated`). A remote source starts the connection
//! supervisor with the host's declared names and returns immediately.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use sgate_core::{
    ConfigError, ConnectionState, ErrorDetail, GatewayConfig, GatewayError, SourceConfig,
    SourceHealth, ValidationOutcome,
};
use sgate_remote::{
    AuthorityError, ConnectionSupervisor, RemoteFetcher, RemoteFetcherConfig, SupervisorError,
    SupervisorStatus,
};
use sgate_schema::{populate_from_directory, PopulationReport, RegistryDiagnostics, SchemaRegistry};

use crate::action::ActionGate;
use crate::diagnostics::{GateDiagnostics, GateSnapshot};
use crate::event::EventGate;
use crate::host::ServiceHost;

/// Failure to bring up or reload the gateway.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("invalid gateway configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("schema authority client: {0}")]
    Authority(#[from] AuthorityError),
    #[error("connection supervisor: {0}")]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Source(#[from] GatewayError),
}

enum Source {
    Filesystem {
        directory: PathBuf,
        report: Mutex<Option<PopulationReport>>,
    },
    Remote {
        supervisor: ConnectionSupervisor<RemoteFetcher>,
        names: Vec<String>,
    },
}

/// Reportable snapshot of the whole gateway.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayDiagnostics {
    pub source: &'static str,
    pub health: SourceHealth,
    pub registry: RegistryDiagnostics,
    pub gate: GateSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<PopulationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<SupervisorStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_error: Option<ErrorDetail>,
}

/// A running schema gateway attached to one host service.
pub struct SchemaGateway {
    config: GatewayConfig,
    registry: Arc<SchemaRegistry>,
    diagnostics: Arc<GateDiagnostics>,
    action_gate: ActionGate,
    event_gate: EventGate,
    source: Source,
    startup_error: Mutex<Option<GatewayError>>,
}

impl std::fmt::Debug for SchemaGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaGateway")
            .field("source", &self.config.source.kind())
            .field("policy", &self.config.policy)
            .field("loaded", &self.registry.len())
            .finish()
    }
}

impl SchemaGateway {
    /// Attach a gateway to `host` and populate its registry.
    ///
    /// # Errors
    ///
    /// Only configuration and wiring problems are returned. Schema source
    /// failures never fail startup; see [`startup_error`](Self::startup_error)
    /// and [`health`](Self::health).
    pub fn start<H>(config: GatewayConfig, host: &mut H) -> Result<Self, BootstrapError>
    where
        H: ServiceHost + ?Sized,
    {
        config.validate()?;

        let registry = Arc::new(SchemaRegistry::default());
        let diagnostics = Arc::new(GateDiagnostics::new());
        let action_gate =
            ActionGate::new(Arc::clone(&registry), config.policy, Arc::clone(&diagnostics));
        let event_gate =
            EventGate::new(Arc::clone(&registry), config.policy, Arc::clone(&diagnostics));

        host.register_before_call(Arc::new(action_gate.clone()));
        host.register_event_wrapper(Arc::new(event_gate.clone()));

        let source = match &config.source {
            SourceConfig::Filesystem { directory } => Source::Filesystem {
                directory: directory.clone(),
                report: Mutex::new(None),
            },
            SourceConfig::Remote {
                endpoint,
                retry_threshold,
                retry_timeout_ms,
                request_timeout_secs,
            } => {
                let fetcher = RemoteFetcher::new(RemoteFetcherConfig {
                    base_url: endpoint.clone(),
                    timeout_secs: *request_timeout_secs,
                })?;
                Source::Remote {
                    supervisor: ConnectionSupervisor::new(
                        Arc::new(fetcher),
                        Arc::clone(&registry),
                        *retry_threshold,
                        Duration::from_millis(*retry_timeout_ms),
                    ),
                    names: host.declared_names(),
                }
            }
        };

        tracing::info!(
            service = %host.service_name(),
            source = config.source.kind(),
            missing_schema = ?config.policy.missing_schema,
            drop_invalid_events = config.policy.drop_invalid_events,
            "Schema gateway installed"
        );

        let gateway = Self {
            config,
            registry,
            diagnostics,
            action_gate,
            event_gate,
            source,
            startup_error: Mutex::new(None),
        };

        match &gateway.source {
            Source::Filesystem { .. } => {
                if let Err(e) = gateway.populate_filesystem() {
                    tracing::error!(
                        code = e.code(),
                        "Schema population failed, calls will be unvalidated: {e}"
                    );
                    *gateway.startup_error.lock() = Some(e);
                }
            }
            Source::Remote { supervisor, names } => supervisor.start(names.clone())?,
        }

        Ok(gateway)
    }

    /// Run one filesystem pass. Names whose files disappeared are dropped
    /// from the registry; names whose files now fail keep their previous
    /// schema.
    fn populate_filesystem(&self) -> Result<(), GatewayError> {
        let Source::Filesystem { directory, report } = &self.source else {
            return Ok(());
        };
        let pass = populate_from_directory(&self.registry, directory)?;

        let present: BTreeSet<&str> = pass
            .loaded
            .iter()
            .map(String::as_str)
            .chain(pass.parse_failures.iter().map(|f| f.name.as_str()))
            .chain(pass.invalid.iter().map(|i| i.name.as_str()))
            .collect();
        for name in self.registry.names() {
            if !present.contains(name.as_str()) {
                self.registry.remove(&name);
                tracing::info!(schema_name = %name, "Schema file removed, entry invalidated");
            }
        }
        for error in pass.errors() {
            tracing::warn!(code = error.code(), "{error}");
        }

        *report.lock() = Some(pass);
        Ok(())
    }

    /// Unattended reload: re-scan the schema directory, or restart the
    /// supervisor (resetting its retry budget) and re-fetch every declared
    /// name.
    ///
    /// # Errors
    ///
    /// `Source(DirectoryNotFound)` when the directory is gone; the registry
    /// keeps its current entries. `Supervisor` when the restart fails.
    pub async fn reload(&self) -> Result<(), BootstrapError> {
        match &self.source {
            Source::Filesystem { .. } => {
                let result = self.populate_filesystem();
                *self.startup_error.lock() = result.clone().err();
                result?;
            }
            Source::Remote { supervisor, names } => supervisor.restart(names.clone()).await?,
        }
        tracing::info!(source = self.config.source.kind(), "Schema gateway reloaded");
        Ok(())
    }

    /// Wait for an in-flight remote population to settle. Immediate for a
    /// filesystem source.
    pub async fn wait_settled(&self) {
        if let Source::Remote { supervisor, .. } = &self.source {
            supervisor.wait_settled().await;
        }
    }

    /// Stop background work. Pending retries are halted.
    pub async fn shutdown(&self) {
        if let Source::Remote { supervisor, .. } = &self.source {
            supervisor.stop().await;
        }
        tracing::info!("Schema gateway shut down");
    }

    /// Run the action gate directly, as the before-call hook would.
    pub fn validate_call(
        &self,
        name: &str,
        payload: &Value,
    ) -> Result<ValidationOutcome, GatewayError> {
        self.action_gate.check(name, payload)
    }

    /// The action gate's verdict for `payload`, without recording it in the
    /// gate diagnostics.
    pub fn dry_run_call(
        &self,
        name: &str,
        payload: &Value,
    ) -> Result<ValidationOutcome, GatewayError> {
        self.action_gate.dry_run(name, payload)
    }

    /// Source health.
    pub fn health(&self) -> SourceHealth {
        match &self.source {
            Source::Remote { supervisor, .. } => supervisor.health(),
            Source::Filesystem { directory, report } => {
                if let Some(e) = self.startup_error.lock().as_ref() {
                    return SourceHealth::Unavailable {
                        reason: e.to_string(),
                    };
                }
                match report.lock().as_ref() {
                    None => SourceHealth::Unavailable {
                        reason: format!("{} not scanned", directory.display()),
                    },
                    Some(r) if r.is_clean() => SourceHealth::Healthy,
                    Some(r) => SourceHealth::Degraded {
                        reason: format!("{} schemas failed to load", r.failure_count()),
                    },
                }
            }
        }
    }

    /// The persistent degraded-mode condition, if any: the startup error
    /// of a filesystem source or the exhausted budget of a remote one.
    pub fn check(&self) -> Result<(), GatewayError> {
        match &self.source {
            Source::Remote { supervisor, .. } => supervisor.check(),
            Source::Filesystem { .. } => match self.startup_error.lock().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            },
        }
    }

    /// Error from the last filesystem pass that could not run at all.
    pub fn startup_error(&self) -> Option<GatewayError> {
        self.startup_error.lock().clone()
    }

    /// Connectivity state of a remote source.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        match &self.source {
            Source::Remote { supervisor, .. } => Some(supervisor.state()),
            Source::Filesystem { .. } => None,
        }
    }

    pub fn diagnostics(&self) -> GatewayDiagnostics {
        let (population, connection) = match &self.source {
            Source::Filesystem { report, .. } => (report.lock().clone(), None),
            Source::Remote { supervisor, .. } => (None, Some(supervisor.status())),
        };
        GatewayDiagnostics {
            source: self.config.source.kind(),
            health: self.health(),
            registry: self.registry.diagnostics(),
            gate: self.diagnostics.snapshot(),
            population,
            connection,
            startup_error: self.startup_error.lock().as_ref().map(GatewayError::detail),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn action_gate(&self) -> &ActionGate {
        &self.action_gate
    }

    pub fn event_gate(&self) -> &EventGate {
        &self.event_gate
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
