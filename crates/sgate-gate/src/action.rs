//! # Action Gate
//!
//! Runs before every inbound action call, keyed by the call's logical name.
//!
//! | Outcome       | `missing_schema = warn`   | `missing_schema = reject` |
//! |---------------|---------------------------|---------------------------|
//! | `Accepted`    | proceed                   | proceed                   |
//! | `Rejected`    | refuse, `PAYLOAD_REJECTED`| refuse, `PAYLOAD_REJECTED`|
//! | `Unvalidated` | proceed, warning recorded | refuse, `MISSING_SCHEMA`  |
//!
//! A refusal carries the engine's error list unchanged.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use sgate_core::{GatePolicy, GatewayError, MissingSchemaPolicy, ValidationOutcome};
use sgate_schema::SchemaRegistry;

use crate::diagnostics::{Decision, GateDiagnostics, GateFailure, GateKind};
use crate::host::BeforeCallHook;

/// Before-call validation gate.
#[derive(Debug, Clone)]
pub struct ActionGate {
    registry: Arc<SchemaRegistry>,
    policy: GatePolicy,
    diagnostics: Arc<GateDiagnostics>,
}

impl ActionGate {
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

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Validate a call payload and apply the gate policy, recording the
    /// decision in the gate diagnostics.
    ///
    /// Returns the outcome when the call may proceed (`Accepted`, or
    /// `Unvalidated` under the warn policy).
    ///
    /// # Errors
    ///
    /// `PayloadRejected` with the engine's errors, or `MissingSchema` when
    /// no schema applies and the policy is `reject`.
    pub fn check(&self, call_name: &str, payload: &Value) -> Result<ValidationOutcome, GatewayError> {
        let outcome = self.registry.validate_payload(call_name, payload);
        self.record(call_name, &outcome);
        self.decide(call_name, outcome)
    }

    /// Same verdict as [`check`](Self::check), with nothing logged or
    /// counted. For ad-hoc validation outside real traffic.
    pub fn dry_run(&self, call_name: &str, payload: &Value) -> Result<ValidationOutcome, GatewayError> {
        let outcome = self.registry.validate_payload(call_name, payload);
        self.decide(call_name, outcome)
    }

    fn blocks_unvalidated(&self) -> bool {
        self.policy.missing_schema == MissingSchemaPolicy::Reject
    }

    fn decide(&self, call_name: &str, outcome: ValidationOutcome) -> Result<ValidationOutcome, GatewayError> {
        match outcome {
            ValidationOutcome::Rejected(violations) => Err(GatewayError::PayloadRejected {
                name: call_name.to_string(),
                violations,
            }),
            ValidationOutcome::Unvalidated(_) if self.blocks_unvalidated() => {
                Err(GatewayError::MissingSchema {
                    name: call_name.to_string(),
                })
            }
            outcome => Ok(outcome),
        }
    }

    fn record(&self, call_name: &str, outcome: &ValidationOutcome) {
        match outcome {
            ValidationOutcome::Accepted => {
                self.diagnostics.record(GateKind::Action, Decision::Accepted);
            }
            ValidationOutcome::Rejected(violations) => {
                tracing::warn!(
                    call = %call_name,
                    errors = violations.len(),
                    "Action payload rejected by schema"
                );
                self.diagnostics.record_failure(GateFailure {
                    kind: GateKind::Action,
                    decision: Decision::Rejected,
                    name: call_name.to_string(),
                    reason: "payload-rejected".into(),
                    errors: violations.violations().to_vec(),
                    sender: None,
                    dropped: false,
                    at: Utc::now(),
                });
            }
            ValidationOutcome::Unvalidated(reason) => {
                let blocked = self.blocks_unvalidated();
                if blocked {
                    tracing::warn!(call = %call_name, %reason, "Action refused: no schema to validate against");
                } else {
                    tracing::warn!(call = %call_name, %reason, "Action proceeding unvalidated");
                }
                self.diagnostics.record_failure(GateFailure {
                    kind: GateKind::Action,
                    decision: if blocked {
                        Decision::Blocked
                    } else {
                        Decision::Unvalidated
                    },
                    name: call_name.to_string(),
                    reason: reason.as_str().to_string(),
                    errors: Vec::new(),
                    sender: None,
                    dropped: false,
                    at: Utc::now(),
                });
            }
        }
    }
}

impl BeforeCallHook for ActionGate {
    fn before_call(&self, call_name: &str, payload: &Value) -> Result<(), GatewayError> {
        self.check(call_name, payload).map(|_| ())
    }
}
