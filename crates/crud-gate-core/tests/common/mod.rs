// crud-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Gate builders, rule fixtures, and a recording audit sink.
// ============================================================================

//! Shared helpers for crud-gate-core integration tests.

#![allow(
    dead_code,
    clippy::unwrap_used,
    reason = "Not every test binary uses every helper; fixtures unwrap static inputs."
)]

use std::sync::Arc;
use std::sync::Mutex;

use crud_gate_core::AuditSink;
use crud_gate_core::Claims;
use crud_gate_core::Comparator;
use crud_gate_core::Gate;
use crud_gate_core::GateAuditEvent;
use crud_gate_core::Operand;
use crud_gate_core::Rule;
use crud_gate_core::ValueType;
use serde_json::Map;
use serde_json::Value;

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GateAuditEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<GateAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &GateAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Gate with a silent audit sink.
pub fn quiet_gate(secret: &str) -> Gate {
    Gate::new(secret).with_audit_sink(Arc::new(crud_gate_core::NoopAuditSink))
}

/// `args.auth.id == args.find.owner`.
pub fn owner_rule() -> Rule {
    Rule::matches(
        Comparator::Equals,
        ValueType::String,
        Operand::field("args.auth.id").unwrap(),
        Operand::field("args.find.owner").unwrap(),
    )
}

/// Claims carrying only an id.
pub fn claims_for(id: &str) -> Claims {
    Claims::new().with("id", id)
}

/// Filter object `{"owner": <owner>}`.
pub fn owner_filter(owner: &str) -> Map<String, Value> {
    let mut find = Map::new();
    find.insert("owner".to_string(), Value::String(owner.to_string()));
    find
}
