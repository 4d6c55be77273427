// crud-gate-core/src/lib.rs
// ============================================================================
// Module: CRUD Gate Core Library
// Description: Public API surface for the CRUD gate core.
// Purpose: Expose rule types, request contracts, and the gate runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! CRUD gate core decides whether a caller may run a create, read, update,
//! delete, aggregate, or batch operation against a database collection. It
//! issues and verifies HS256 bearer tokens, resolves the configured rule for
//! each operation, and evaluates that rule against caller claims and request
//! arguments. Every ambiguous or erroring condition denies.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::DelegateError;
pub use interfaces::RuleDelegate;
pub use runtime::AuditSink;
pub use runtime::DenialReason;
pub use runtime::EvaluationError;
pub use runtime::Gate;
pub use runtime::GateAuditEvent;
pub use runtime::GateError;
pub use runtime::NoopAuditSink;
pub use runtime::RuleEvaluator;
pub use runtime::StderrAuditSink;
pub use runtime::TokenError;
pub use runtime::TokenService;
pub use runtime::parse_bearer_header;
