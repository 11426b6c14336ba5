//! # Connection Supervisor
//!
//! Drives connectivity to a remote schema authority and populates the
//! registry once connected.
//!
//! ## States
//!
//! DISCONNECTED → CONNECTING → CONNECTED
//!                    ↓
//!               DISCONNECTED → (after retry_timeout) CONNECTING → …
//!                    ↓ attempts_made >= retry_threshold
//!                EXHAUSTED (terminal until `restart`)
//!
//! ## Invariants
//!
//! - The retry budget belongs to this instance. Two supervisors never share
//!   a counter.
//! - Attempts are paced by `retry_timeout` and bounded by `retry_threshold`.
//!   Once exhausted no further attempt is scheduled.
//! - The supervisor task is the only place that waits. The registry stays
//!   readable throughout; names not yet loaded validate as `Unvalidated`.
//! - A connectivity failure while fetching schemas counts against the same
//!   budget as a failed probe. The supervisor drops back to `Disconnected`
//!   and the next cycle fetches only the names not yet resolved.
//! - `stop()` halts a pending retry and awaits the task, even while other
//!   callers are in `wait_settled()`. Dropping the supervisor aborts it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use sgate_core::{ConnectionState, GatewayError, RetryBudget, SourceHealth};
use sgate_schema::SchemaRegistry;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::authority::{AuthorityError, SchemaAuthority};

/// Supervisor lifecycle misuse.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("supervisor is already running")]
    AlreadyRunning,
    #[error("retry budget exhausted; restart the supervisor to try again")]
    Exhausted,
    #[error("no tokio runtime available to run the supervisor")]
    NoRuntime,
}

/// Reportable snapshot of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorStatus {
    /// Authority endpoint.
    pub endpoint: String,
    /// Current connectivity state.
    pub state: ConnectionState,
    /// Failed attempts so far.
    pub attempts_made: u32,
    /// Maximum failed attempts.
    pub retry_threshold: u32,
    /// Delay between attempts, in milliseconds.
    pub retry_timeout_ms: u64,
    /// Names the authority had no schema for.
    pub unresolved: Vec<String>,
}

struct Shared {
    endpoint: String,
    budget: Mutex<RetryBudget>,
    state: watch::Sender<ConnectionState>,
    unresolved: Mutex<Vec<String>>,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(endpoint = %self.endpoint, from = %previous, to = %next, "Connection state changed");
        }
    }
}

struct Running {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
    finished: watch::Receiver<bool>,
}

/// Supervises connectivity to one schema authority.
pub struct ConnectionSupervisor<A: SchemaAuthority> {
    authority: Arc<A>,
    registry: Arc<SchemaRegistry>,
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl<A: SchemaAuthority> ConnectionSupervisor<A> {
    /// Create a supervisor in `Disconnected` with a fresh retry budget.
    pub fn new(
        authority: Arc<A>,
        registry: Arc<SchemaRegistry>,
        retry_threshold: u32,
        retry_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared {
            endpoint: authority.endpoint(),
            budget: Mutex::new(RetryBudget::new(retry_threshold, retry_timeout)),
            state,
            unresolved: Mutex::new(Vec::new()),
        });
        Self {
            authority,
            registry,
            shared,
            running: Mutex::new(None),
        }
    }

    /// Begin connecting. `names` are the call and event names the host
    /// service declared; each is fetched once the authority answers.
    ///
    /// Returns immediately; the work runs on a spawned task.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if a previous start is still in progress,
    /// `Exhausted` if the budget is spent (use [`restart`](Self::restart)),
    /// `NoRuntime` outside a tokio runtime.
    pub fn start(&self, names: Vec<String>) -> Result<(), SupervisorError> {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Err(SupervisorError::AlreadyRunning);
        }
        if self.state() == ConnectionState::Exhausted {
            return Err(SupervisorError::Exhausted);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SupervisorError::NoRuntime)?;

        let mut names = names;
        names.sort();
        names.dedup();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (finished_tx, finished) = watch::channel(false);
        let task = run(
            Arc::clone(&self.authority),
            Arc::clone(&self.registry),
            Arc::clone(&self.shared),
            names,
            shutdown_rx,
        );
        let handle = runtime.spawn(async move {
            task.await;
            finished_tx.send_replace(true);
        });
        *running = Some(Running {
            handle,
            shutdown,
            finished,
        });
        tracing::info!(endpoint = %self.shared.endpoint, "Schema authority supervisor started");
        Ok(())
    }

    /// Manual restart: halt any pending work, reset the retry budget and
    /// start a fresh attempt cycle.
    pub async fn restart(&self, names: Vec<String>) -> Result<(), SupervisorError> {
        self.stop().await;
        self.shared.budget.lock().reset();
        self.shared.set_state(ConnectionState::Disconnected);
        tracing::info!(endpoint = %self.shared.endpoint, "Schema authority supervisor restarting");
        self.start(names)
    }

    /// Halt pending retries and wait for the task to finish.
    ///
    /// A supervisor that was still connecting ends in `Disconnected`;
    /// `Connected` and `Exhausted` are kept.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(Running {
            handle, shutdown, ..
        }) = running
        {
            shutdown.send_replace(true);
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!(endpoint = %self.shared.endpoint, "Supervisor task failed: {e}");
                }
            }
        }
        if matches!(self.state(), ConnectionState::Connecting) {
            self.shared.set_state(ConnectionState::Disconnected);
        }
    }

    /// Wait until the current attempt cycle settles: population finished,
    /// budget exhausted, or stopped.
    ///
    /// The task stays owned by the supervisor, so `stop()` still reaches it.
    pub async fn wait_settled(&self) {
        let finished = self.running.lock().as_ref().map(|r| r.finished.clone());
        if let Some(mut finished) = finished {
            // Err means the task was aborted before publishing; it is gone either way.
            let _ = finished.wait_for(|done| *done).await;
        }
    }

    /// Current connectivity state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Names the authority had no schema for in the last population.
    pub fn unresolved(&self) -> Vec<String> {
        self.shared.unresolved.lock().clone()
    }

    /// Reportable snapshot.
    pub fn status(&self) -> SupervisorStatus {
        let budget = self.shared.budget.lock().clone();
        SupervisorStatus {
            endpoint: self.shared.endpoint.clone(),
            state: self.state(),
            attempts_made: budget.attempts_made(),
            retry_threshold: budget.retry_threshold(),
            retry_timeout_ms: u64::try_from(budget.retry_timeout().as_millis()).unwrap_or(u64::MAX),
            unresolved: self.unresolved(),
        }
    }

    /// Health signal derived from the connectivity state.
    pub fn health(&self) -> SourceHealth {
        let status = self.status();
        match status.state {
            ConnectionState::Exhausted => SourceHealth::Unavailable {
                reason: format!(
                    "schema authority {} unreachable after {} attempts",
                    status.endpoint, status.attempts_made
                ),
            },
            ConnectionState::Connected => {
                let failures = self.registry.failure_count();
                if status.unresolved.is_empty() && failures == 0 {
                    SourceHealth::Healthy
                } else {
                    SourceHealth::Degraded {
                        reason: format!(
                            "{} names without a remote schema, {} failed to load",
                            status.unresolved.len(),
                            failures
                        ),
                    }
                }
            }
            ConnectionState::Connecting | ConnectionState::Disconnected => SourceHealth::Degraded {
                reason: format!(
                    "connecting to schema authority {} ({} of {} attempts failed)",
                    status.endpoint, status.attempts_made, status.retry_threshold
                ),
            },
        }
    }

    /// Surface the exhausted condition as a taxonomy error.
    pub fn check(&self) -> Result<(), GatewayError> {
        if self.state() == ConnectionState::Exhausted {
            return Err(GatewayError::ConnectivityExhausted {
                endpoint: self.shared.endpoint.clone(),
                attempts: self.shared.budget.lock().attempts_made(),
            });
        }
        Ok(())
    }
}

impl<A: SchemaAuthority> Drop for ConnectionSupervisor<A> {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.shutdown.send_replace(true);
            running.handle.abort();
        }
    }
}

async fn run<A: SchemaAuthority>(
    authority: Arc<A>,
    registry: Arc<SchemaRegistry>,
    shared: Arc<Shared>,
    names: Vec<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut pending = names;
    let declared = pending.len();
    shared.unresolved.lock().clear();

    loop {
        shared.set_state(ConnectionState::Connecting);
        let probe = tokio::select! {
            result = authority.ping() => result,
            _ = shutdown.changed() => return,
        };

        let failure = match probe {
            Ok(()) => {
                shared.set_state(ConnectionState::Connected);
                tracing::info!(endpoint = %shared.endpoint, "Connected to schema authority");
                let population =
                    populate(authority.as_ref(), &registry, &shared, &mut pending, &mut shutdown)
                        .await;
                match population {
                    Population::Complete => {
                        registry.mark_populated();
                        tracing::info!(
                            endpoint = %shared.endpoint,
                            declared,
                            loaded = registry.len(),
                            unresolved = shared.unresolved.lock().len(),
                            "Remote schema population complete"
                        );
                        return;
                    }
                    Population::Stopped => return,
                    Population::Interrupted(e) => e,
                }
            }
            Err(e) => e,
        };

        let (exhausted, attempts, threshold, timeout) = {
            let mut budget = shared.budget.lock();
            let exhausted = budget.record_failure();
            (
                exhausted,
                budget.attempts_made(),
                budget.retry_threshold(),
                budget.retry_timeout(),
            )
        };

        if exhausted {
            shared.set_state(ConnectionState::Exhausted);
            tracing::error!(
                endpoint = %shared.endpoint,
                attempts,
                unfetched = pending.len(),
                "Schema authority unreachable, retry budget exhausted; calls will be unvalidated: {failure}"
            );
            return;
        }

        shared.set_state(ConnectionState::Disconnected);
        tracing::warn!(
            endpoint = %shared.endpoint,
            attempt = attempts,
            retry_threshold = threshold,
            unfetched = pending.len(),
            "Schema authority unreachable, retrying in {timeout:?}: {failure}"
        );
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {}
            _ = shutdown.changed() => return,
        }
    }
}

/// How a population pass ended.
enum Population {
    /// Every pending name was resolved, missing, or failed for a non-connectivity reason.
    Complete,
    /// The authority became unreachable; the names still in `pending` were not fetched.
    Interrupted(AuthorityError),
    Stopped,
}

/// Fetch and load each pending name. Names are removed from `pending` as
/// they are settled, so an interrupted pass resumes where it stopped.
async fn populate<A: SchemaAuthority>(
    authority: &A,
    registry: &SchemaRegistry,
    shared: &Shared,
    pending: &mut Vec<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> Population {
    let mut settled = 0usize;
    let mut outcome = Population::Complete;

    for name in pending.iter() {
        let fetched = tokio::select! {
            result = authority.fetch(name) => result,
            _ = shutdown.changed() => {
                outcome = Population::Stopped;
                break;
            }
        };
        match fetched {
            Ok(Some(document)) => {
                if let Err(e) = registry.load(name, document) {
                    registry.record_failure(name, e.to_string());
                }
            }
            Ok(None) => {
                tracing::warn!(
                    schema_name = %name,
                    endpoint = %shared.endpoint,
                    "No remote schema for declared name; calls will be unvalidated"
                );
                shared.unresolved.lock().push(name.clone());
            }
            Err(e) if e.is_connectivity() => {
                outcome = Population::Interrupted(e);
                break;
            }
            Err(e) => {
                tracing::warn!(schema_name = %name, "Remote schema fetch failed: {e}");
                registry.record_failure(name, e.to_string());
            }
        }
        settled += 1;
    }

    pending.drain(..settled);
    outcome
}
