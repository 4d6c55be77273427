// crud-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: CRUD Gate Interfaces
// Description: Contract surfaces for decisions made outside the gate.
// Purpose: Let `webhook` rules consult an external decider without a client.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The gate never performs network I/O itself. A `webhook` rule is decided by
//! a [`RuleDelegate`] registered on the gate; without one, the rule denies.
//! Delegates must be deterministic for a given input and fail closed on any
//! transport or decoding problem.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::EvaluationArgs;

// ============================================================================
// SECTION: Rule Delegate
// ============================================================================

/// Delegate errors. Every variant denies the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegateError {
    /// The delegate endpoint could not be reached.
    #[error("delegate unreachable: {0}")]
    Unreachable(String),
    /// The delegate answered with an unusable response.
    #[error("delegate rejected request: {0}")]
    Rejected(String),
}

/// External decider for `webhook` rules.
pub trait RuleDelegate: Send + Sync {
    /// Decides whether the arguments satisfy the rule behind `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DelegateError`] when no decision can be made.
    fn decide(&self, url: &str, args: &EvaluationArgs) -> Result<bool, DelegateError>;
}
