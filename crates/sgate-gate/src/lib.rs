//! # sgate-gate — Interception Gates
//!
//! Puts schema validation on the two inbound paths of a host service.
//!
//! - [`ActionGate`] runs before every action call. A rejected payload
//!   refuses the call with the engine's error list; an unvalidated one
//!   proceeds with a recorded warning unless the missing-schema policy is
//!   `reject`.
//! - [`EventGate`] wraps event handlers. It never raises into the delivery
//!   path: failures are recorded, and delivery continues unless dropping is
//!   configured.
//! - [`GateDiagnostics`] counts decisions and retains recent failures.
//! - [`SchemaGateway`] is the bootstrap: it installs both gates into a
//!   [`ServiceHost`] and populates the registry from the configured source.
//!
//! An action call has a caller waiting for an accept or reject; an event
//! has none, so only the action gate blocks.

pub mod action;
pub mod diagnostics;
pub mod event;
pub mod gateway;
pub mod host;

pub use action::ActionGate;
pub use diagnostics::{Decision, DecisionCounts, GateDiagnostics, GateFailure, GateKind, GateSnapshot};
pub use event::{Delivery, EventGate};
pub use gateway::{BootstrapError, GatewayDiagnostics, SchemaGateway};
pub use host::{
    ActionHandler, BeforeCallHook, EventContext, EventHandler, EventWrapper, HostError, LocalHost,
    ServiceHost,
};
