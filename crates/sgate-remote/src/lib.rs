//! # sgate-remote — Remote Schema Authority
//!
//! Populates a [`sgate_schema::SchemaRegistry`] from a remote schema
//! authority.
//!
//! - [`SchemaAuthority`] — the two operations the gateway needs from an
//!   authority: a liveness probe and a fetch by logical name. "Not found"
//!   is `Ok(None)`, distinct from connectivity failure.
//! - [`RemoteFetcher`] — the HTTP binding of the authority protocol.
//! - [`ConnectionSupervisor`] — owns the connectivity state machine and the
//!   retry budget, and feeds fetched documents into the registry.
//!
//! ## Crate Policy
//!
//! - Retries live only in the supervisor. The fetcher issues one request
//!   per call; the registry never retries.
//! - The supervisor never blocks the call path: population runs on its own
//!   task and the registry simply stays thin until it completes.

pub mod authority;
pub mod fetcher;
pub mod supervisor;

pub use authority::{AuthorityError, SchemaAuthority};
pub use fetcher::{RemoteFetcher, RemoteFetcherConfig};
pub use supervisor::{ConnectionSupervisor, SupervisorError, SupervisorStatus};
