// crud-gate-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Rule Evaluator
// Description: Evaluates rule trees against evaluation arguments.
// Purpose: Produce an allow/deny answer or an error that denies.
// Dependencies: crate::{core, interfaces, runtime::comparator}, thiserror
// ============================================================================

//! ## Overview
//! The evaluator walks a [`Rule`] tree. `and` stops at the first denying
//! clause and `or` at the first allowing one; an error from any evaluated
//! clause propagates. Nothing in this module maps an error to allow.
//!
//! `webhook` rules are decided by the registered [`RuleDelegate`]. Without a
//! delegate they fail with [`EvaluationError::DelegateUnavailable`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::Comparator;
use crate::core::EvaluationArgs;
use crate::core::MAX_RULE_DEPTH;
use crate::core::MatchRule;
use crate::core::Operand;
use crate::core::Rule;
use crate::core::ValueType;
use crate::interfaces::DelegateError;
use crate::interfaces::RuleDelegate;
use crate::runtime::comparator::compare_operands;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Evaluation failures. Every variant denies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A field operand did not resolve.
    #[error("field {path} is missing")]
    MissingField {
        /// Unresolved field path.
        path: String,
    },
    /// An operand does not carry the expected type.
    #[error("{operand} is not a {expected} value")]
    TypeMismatch {
        /// Operand label (field path or `literal`).
        operand: String,
        /// Expected type description.
        expected: String,
    },
    /// The comparator cannot apply to the declared type.
    #[error("comparator {comparator} is not supported for {value_type} values")]
    UnsupportedComparison {
        /// Offending comparator.
        comparator: Comparator,
        /// Declared value type.
        value_type: ValueType,
    },
    /// The rule kind is not understood.
    #[error("unsupported rule kind")]
    UnsupportedRule,
    /// A `webhook` rule has no registered delegate.
    #[error("no delegate registered for webhook {url}")]
    DelegateUnavailable {
        /// Webhook url of the rule.
        url: String,
    },
    /// The delegate could not decide.
    #[error(transparent)]
    Delegate(#[from] DelegateError),
    /// The rule tree nests deeper than allowed.
    #[error("rule tree exceeds max depth {max_depth}")]
    TooDeep {
        /// Maximum allowed depth.
        max_depth: usize,
    },
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Evaluates rule trees, optionally consulting a delegate for `webhook` rules.
#[derive(Clone, Default)]
pub struct RuleEvaluator {
    /// Decider for `webhook` rules.
    delegate: Option<Arc<dyn RuleDelegate>>,
}

impl RuleEvaluator {
    /// Creates an evaluator without a delegate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy that consults the delegate for `webhook` rules.
    #[must_use]
    pub fn with_delegate(mut self, delegate: Arc<dyn RuleDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Returns true when a delegate is registered.
    #[must_use]
    pub const fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    /// Evaluates a rule against the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] when the rule cannot be decided.
    pub fn evaluate(&self, rule: &Rule, args: &EvaluationArgs) -> Result<bool, EvaluationError> {
        self.evaluate_at(rule, args, 1)
    }

    /// Evaluates a node at the given depth.
    fn evaluate_at(
        &self,
        rule: &Rule,
        args: &EvaluationArgs,
        depth: usize,
    ) -> Result<bool, EvaluationError> {
        if depth > MAX_RULE_DEPTH {
            return Err(EvaluationError::TooDeep {
                max_depth: MAX_RULE_DEPTH,
            });
        }
        match rule {
            Rule::Allow => Ok(true),
            Rule::Deny => Ok(false),
            Rule::Match(rule) => evaluate_match(rule, args),
            Rule::And {
                clauses,
            } => {
                for clause in clauses {
                    if !self.evaluate_at(clause, args, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(!clauses.is_empty())
            }
            Rule::Or {
                clauses,
            } => {
                for clause in clauses {
                    if self.evaluate_at(clause, args, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rule::Not {
                clause,
            } => Ok(!self.evaluate_at(clause, args, depth + 1)?),
            Rule::Webhook {
                url,
            } => {
                let Some(delegate) = &self.delegate else {
                    return Err(EvaluationError::DelegateUnavailable {
                        url: url.clone(),
                    });
                };
                Ok(delegate.decide(url, args)?)
            }
            Rule::Unsupported => Err(EvaluationError::UnsupportedRule),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves both operands and compares them.
fn evaluate_match(rule: &MatchRule, args: &EvaluationArgs) -> Result<bool, EvaluationError> {
    let left = resolve_operand(&rule.f1, args)?;
    let right = resolve_operand(&rule.f2, args)?;
    compare_operands(rule, left, right)
}

/// Resolves an operand to a value.
fn resolve_operand<'a>(
    operand: &'a Operand,
    args: &'a EvaluationArgs,
) -> Result<&'a serde_json::Value, EvaluationError> {
    match operand {
        Operand::Literal(value) => Ok(value),
        Operand::Field(path) => args.resolve(path).ok_or_else(|| EvaluationError::MissingField {
            path: path.as_str().to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
