//! # Event Gate
//!
//! Wraps event handlers so every delivered payload is validated before the
//! handler runs. Unlike the action gate nothing here raises: events have no
//! caller waiting on a verdict, so a failure is recorded in the gate
//! diagnostics and delivery continues.
//!
//! Delivery is skipped only when
//! - the payload is rejected and `drop_invalid_events` is set, or
//! - no schema applies and the missing-schema policy is `reject`.

use std::sync::Arc;

use chrono::Utc;
use sgate_core::{GatePolicy, MissingSchemaPolicy, ValidationOutcome};
use sgate_schema::SchemaRegistry;

use crate::diagnostics::{Decision, GateDiagnostics, GateFailure, GateKind};
use crate::host::{EventContext, EventHandler, EventWrapper};

/// Whether an inspected event reaches its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Deliver,
    Drop,
}

/// Event-delivery validation gate.
#[derive(Debug, Clone)]
pub struct EventGate {
    registry: Arc<SchemaRegistry>,
    policy: GatePolicy,
    diagnostics: Arc<GateDiagnostics>,
}

impl EventGate {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        policy: GatePolicy,
        diagnostics: Arc<GateDiagnostics>,
    ) -> Self {
        Self {
            registry,
            policy,
            diagnostics,
        }
    }

    /// Validate one event and decide whether to deliver it.
    pub fn inspect(&self, context: &EventContext) -> Delivery {
        let name = context.event_name.as_str();
        let outcome = self.registry.validate_payload(name, &context.payload);

        let (decision, reason, errors, delivery) = match outcome {
            ValidationOutcome::Accepted => {
                self.diagnostics.record(GateKind::Event, Decision::Accepted);
                return Delivery::Deliver;
            }
            ValidationOutcome::Rejected(violations) => {
                let delivery = if self.policy.drop_invalid_events {
                    Delivery::Drop
                } else {
                    Delivery::Deliver
                };
                (
                    Decision::Rejected,
                    "payload-rejected",
                    violations.into_inner(),
                    delivery,
                )
            }
            ValidationOutcome::Unvalidated(reason) => match self.policy.missing_schema {
                MissingSchemaPolicy::Warn => {
                    (Decision::Unvalidated, reason.as_str(), Vec::new(), Delivery::Deliver)
                }
                MissingSchemaPolicy::Reject => {
                    (Decision::Blocked, reason.as_str(), Vec::new(), Delivery::Drop)
                }
            },
        };

        let dropped = delivery == Delivery::Drop;
        tracing::warn!(
            event = %name,
            sender = context.sender.as_deref().unwrap_or("-"),
            reason,
            errors = errors.len(),
            dropped,
            "Event failed schema gate"
        );
        self.diagnostics.record_failure(GateFailure {
            kind: GateKind::Event,
            decision,
            name: name.to_string(),
            reason: reason.to_string(),
            errors,
            sender: context.sender.clone(),
            dropped,
            at: Utc::now(),
        });
        delivery
    }
}

impl EventWrapper for EventGate {
    fn wrap(&self, _event_name: &str, handler: EventHandler) -> EventHandler {
        let gate = self.clone();
        Arc::new(move |context: &EventContext| {
            if gate.inspect(context) == Delivery::Deliver {
                handler(context);
            }
        })
    }
}
