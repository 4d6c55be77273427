// crud-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: CRUD Gate Runtime
// Description: Token service, rule evaluator, audit sinks, and the gate.
// Purpose: Decide authentication and authorization for CRUD and file requests.
// Dependencies: crate::{core, interfaces}, jsonwebtoken, serde_json
// ============================================================================

//! ## Overview
//! Runtime modules turn configured rules into decisions. The [`Gate`] holds
//! one versioned snapshot of secret and rules; every entry point reads that
//! snapshot through the same evaluator so callers cannot observe a mixture of
//! old and new configuration.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod comparator;
pub mod evaluator;
pub mod gate;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::GateAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use evaluator::EvaluationError;
pub use evaluator::RuleEvaluator;
pub use gate::DenialReason;
pub use gate::Gate;
pub use gate::GateError;
pub use token::MAX_TOKEN_BYTES;
pub use token::TokenError;
pub use token::TokenService;
pub use token::parse_bearer_header;
