// crud-gate-core/src/core/mod.rs
// ============================================================================
// Module: CRUD Gate Core Types
// Description: Canonical rule, claim, and request structures.
// Purpose: Provide stable, serializable types shared by the runtime and config.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Core types define the rule tree, the rule store layout, caller claims, the
//! CRUD request bodies, and the evaluation argument object. These types carry
//! no locking or I/O; the runtime owns all shared state.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod args;
pub mod claims;
pub mod hashing;
pub mod model;
pub mod operation;
pub mod rule;
pub mod rules;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use args::EvaluationArgs;
pub use claims::Claims;
pub use hashing::token_fingerprint;
pub use model::AggregateRequest;
pub use model::BatchItem;
pub use model::BatchRequest;
pub use model::CreateRequest;
pub use model::DeleteRequest;
pub use model::ReadOptions;
pub use model::ReadRequest;
pub use model::UpdateRequest;
pub use operation::FileOperation;
pub use operation::OperationType;
pub use operation::ParseOperationError;
pub use rule::Comparator;
pub use rule::FieldPath;
pub use rule::MAX_RULE_DEPTH;
pub use rule::MatchRule;
pub use rule::Operand;
pub use rule::Rule;
pub use rule::RuleValidationError;
pub use rule::ValueType;
pub use rules::CollectionRules;
pub use rules::DatabaseRules;
pub use rules::FileMatch;
pub use rules::FileRule;
pub use rules::FileRuleNotFound;
pub use rules::FileRuleSet;
pub use rules::FileStore;
pub use rules::RuleNotFound;
pub use rules::RuleSet;
