//! # Gate Diagnostics
//!
//! Counts every gate decision and keeps the most recent failures so that
//! warnings and event-side rejections stay diagnosable after the fact.
//! Each decision also increments the `sgate_gate_decisions_total` counter
//! (labels `kind`, `outcome`) through the `metrics` facade; without an
//! installed recorder that is a no-op and the in-process counters here
//! remain the source of truth.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sgate_core::Violation;

/// Failures retained for inspection.
pub const RECENT_FAILURE_CAPACITY: usize = 64;

/// Which interception point made a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    Action,
    Event,
}

impl GateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Event => "event",
        }
    }
}

/// Final disposition of one call or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Payload matched its schema.
    Accepted,
    /// Payload failed validation; the call was refused or the event was
    /// recorded (and delivered unless dropping is configured).
    Rejected,
    /// No schema applied; the call or event went through with a warning.
    Unvalidated,
    /// No schema applied and policy refused the call or dropped the event.
    Blocked,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Unvalidated => "unvalidated",
            Self::Blocked => "blocked",
        }
    }
}

/// One recorded failure or warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateFailure {
    pub kind: GateKind,
    pub decision: Decision,
    pub name: String,
    /// `missing-schema`, `registry-not-populated` or `payload-rejected`.
    pub reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Violation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Event was not delivered to its handler.
    pub dropped: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    unvalidated: AtomicU64,
    blocked: AtomicU64,
}

impl Counters {
    fn slot(&self, decision: Decision) -> &AtomicU64 {
        match decision {
            Decision::Accepted => &self.accepted,
            Decision::Rejected => &self.rejected,
            Decision::Unvalidated => &self.unvalidated,
            Decision::Blocked => &self.blocked,
        }
    }

    fn snapshot(&self) -> DecisionCounts {
        DecisionCounts {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unvalidated: self.unvalidated.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
        }
    }
}

/// Decision counts for one gate kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecisionCounts {
    pub accepted: u64,
    pub rejected: u64,
    pub unvalidated: u64,
    pub blocked: u64,
}

impl DecisionCounts {
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected + self.unvalidated + self.blocked
    }
}

/// Point-in-time view of [`GateDiagnostics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateSnapshot {
    pub actions: DecisionCounts,
    pub events: DecisionCounts,
    /// Oldest first.
    pub recent_failures: Vec<GateFailure>,
}

/// Shared decision counters for the action and event gates.
#[derive(Debug, Default)]
pub struct GateDiagnostics {
    actions: Counters,
    events: Counters,
    recent: Mutex<VecDeque<GateFailure>>,
}

impl GateDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a decision.
    pub fn record(&self, kind: GateKind, decision: Decision) {
        let counters = match kind {
            GateKind::Action => &self.actions,
            GateKind::Event => &self.events,
        };
        counters.slot(decision).fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "sgate_gate_decisions_total",
            "kind" => kind.as_str(),
            "outcome" => decision.as_str()
        )
        .increment(1);
    }

    /// Count a decision and retain its failure detail.
    pub fn record_failure(&self, failure: GateFailure) {
        self.record(failure.kind, failure.decision);
        let mut recent = self.recent.lock();
        if recent.len() == RECENT_FAILURE_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(failure);
    }

    pub fn actions(&self) -> DecisionCounts {
        self.actions.snapshot()
    }

    pub fn events(&self) -> DecisionCounts {
        self.events.snapshot()
    }

    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            actions: self.actions.snapshot(),
            events: self.events.snapshot(),
            recent_failures: self.recent.lock().iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(name: &str) -> GateFailure {
        GateFailure {
            kind: GateKind::Event,
            decision: Decision::Rejected,
            name: name.to_string(),
            reason: "payload-rejected".into(),
            errors: vec![Violation::root("boom")],
            sender: Some("node-a".into()),
            dropped: false,
            at: Utc::now(),
        }
    }

    #[test]
    fn counts_per_kind_and_decision() {
        let diag = GateDiagnostics::new();
        diag.record(GateKind::Action, Decision::Accepted);
        diag.record(GateKind::Action, Decision::Accepted);
        diag.record(GateKind::Action, Decision::Blocked);
        diag.record(GateKind::Event, Decision::Unvalidated);

        assert_eq!(
            diag.actions(),
            DecisionCounts {
                accepted: 2,
                blocked: 1,
                ..DecisionCounts::default()
            }
        );
        assert_eq!(diag.events().unvalidated, 1);
        assert_eq!(diag.events().total(), 1);
    }

    #[test]
    fn recent_failures_are_bounded() {
        let diag = GateDiagnostics::new();
        for i in 0..RECENT_FAILURE_CAPACITY + 5 {
            diag.record_failure(failure(&format!("e{i}")));
        }
        let snap = diag.snapshot();
        assert_eq!(snap.recent_failures.len(), RECENT_FAILURE_CAPACITY);
        assert_eq!(snap.recent_failures[0].name, "e5");
        assert_eq!(snap.events.rejected, (RECENT_FAILURE_CAPACITY + 5) as u64);
    }

    #[test]
    fn snapshot_serializes() {
        let diag = GateDiagnostics::new();
        diag.record_failure(failure("orderShipped"));
        let json = serde_json::to_value(diag.snapshot()).unwrap();
        assert_eq!(json["events"]["rejected"], 1);
        assert_eq!(json["recent_failures"][0]["kind"], "event");
        assert_eq!(json["recent_failures"][0]["sender"], "node-a");
    }
}
