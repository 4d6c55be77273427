// crud-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Gate Audit Events
// Description: Structured audit records for authentication and authorization.
// Purpose: Emit redacted decision logs without a logging framework dependency.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every gate decision produces one [`GateAuditEvent`]. Events name the
//! target, the decision, and the failure reason, and correlate callers by a
//! SHA-256 fingerprint of the token. Raw tokens and claim values are never
//! recorded. Deployments route events by supplying their own [`AuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::token_fingerprint;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Gate audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier, e.g. `crud_authorize`.
    pub event: &'static str,
    /// Decision outcome: `allow` or `deny`.
    pub decision: &'static str,
    /// Database identifier for CRUD events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Collection name for CRUD events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Operation label.
    pub operation: String,
    /// File path for file events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Bearer token fingerprint (sha256) when a token was verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_fingerprint: Option<String>,
    /// Failure reason for deny events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Configuration version the decision was made under.
    pub config_version: u64,
}

impl GateAuditEvent {
    /// Builds an event for a CRUD target.
    #[must_use]
    pub fn crud(
        event: &'static str,
        database: &str,
        collection: &str,
        operation: impl Into<String>,
        config_version: u64,
    ) -> Self {
        Self {
            event,
            decision: "allow",
            database: Some(database.to_string()),
            collection: Some(collection.to_string()),
            operation: operation.into(),
            path: None,
            token_fingerprint: None,
            reason: None,
            config_version,
        }
    }

    /// Builds an event for a file target.
    #[must_use]
    pub fn file(
        event: &'static str,
        path: &str,
        operation: impl Into<String>,
        config_version: u64,
    ) -> Self {
        Self {
            event,
            decision: "allow",
            database: None,
            collection: None,
            operation: operation.into(),
            path: Some(path.to_string()),
            token_fingerprint: None,
            reason: None,
            config_version,
        }
    }

    /// Attaches the fingerprint of the token being verified.
    pub fn record_token(&mut self, token: &str) {
        self.token_fingerprint = Some(token_fingerprint(token));
    }

    /// Returns a copy marked as denied with a reason.
    #[must_use]
    pub fn denied(mut self, reason: impl ToString) -> Self {
        self.decision = "deny";
        self.reason = Some(reason.to_string());
        self
    }

    /// Returns true for allow decisions.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.decision == "allow"
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gate decisions.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is the sink's output channel.")]
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests and embedders that route nothing.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
