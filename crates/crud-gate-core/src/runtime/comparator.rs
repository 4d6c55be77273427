// crud-gate-core/src/runtime/comparator.rs
// ============================================================================
// Module: Match Comparator Logic
// Description: Typed comparisons for `match` rules.
// Purpose: Compare resolved operands under a declared value type.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Both operands must carry the declared type; anything else is an error, and
//! errors deny. Integers compare exactly across signed and unsigned ranges;
//! any other number pair compares as `f64`. Strings order lexically by bytes.
//! Booleans support equality and membership only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde_json::Number;
use serde_json::Value;

use crate::core::Comparator;
use crate::core::MatchRule;
use crate::core::ValueType;
use crate::runtime::evaluator::EvaluationError;

// ============================================================================
// SECTION: Match Evaluation
// ============================================================================

/// Compares resolved operands of a `match` rule.
///
/// # Errors
///
/// Returns [`EvaluationError::TypeMismatch`] when an operand does not carry
/// the declared type and [`EvaluationError::UnsupportedComparison`] when the
/// comparator cannot apply to the type.
pub fn compare_operands(rule: &MatchRule, left: &Value, right: &Value) -> Result<bool, EvaluationError> {
    let value_type = rule.value_type;
    if rule.eval.is_ordering() && value_type == ValueType::Bool {
        return Err(EvaluationError::UnsupportedComparison {
            comparator: rule.eval,
            value_type,
        });
    }
    if !value_type.accepts(left) {
        return Err(type_mismatch(rule.f1.label(), value_type.as_str()));
    }

    if rule.eval.is_membership() {
        let Value::Array(items) = right else {
            return Err(type_mismatch(rule.f2.label(), "array"));
        };
        if !items.iter().all(|item| value_type.accepts(item)) {
            return Err(type_mismatch(rule.f2.label(), &format!("array of {value_type}")));
        }
        let contained = items.iter().any(|item| ordering(left, item) == Some(Ordering::Equal));
        return Ok(match rule.eval {
            Comparator::NotIn => !contained,
            _ => contained,
        });
    }

    if !value_type.accepts(right) {
        return Err(type_mismatch(rule.f2.label(), value_type.as_str()));
    }
    match rule.eval {
        Comparator::Equals => Ok(left == right || ordering(left, right) == Some(Ordering::Equal)),
        Comparator::NotEquals => {
            Ok(left != right && ordering(left, right) != Some(Ordering::Equal))
        }
        comparator => {
            let Some(order) = ordering(left, right) else {
                return Err(EvaluationError::UnsupportedComparison {
                    comparator,
                    value_type,
                });
            };
            Ok(match comparator {
                Comparator::GreaterThan => order.is_gt(),
                Comparator::GreaterThanOrEqual => order.is_ge(),
                Comparator::LessThan => order.is_lt(),
                _ => order.is_le(),
            })
        }
    }
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

/// Orders two values of the same primitive type.
fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Number(left), Value::Number(right)) => numeric_cmp(left, right),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

/// Compares two JSON numbers, exactly for integers and by `f64` otherwise.
fn numeric_cmp(left: &Number, right: &Number) -> Option<Ordering> {
    if let (Some(left_int), Some(right_int)) = (integer_value(left), integer_value(right)) {
        return Some(integer_cmp(left_int, right_int));
    }
    left.as_f64()?.partial_cmp(&right.as_f64()?)
}

/// Compares integers across signed and unsigned representations.
fn integer_cmp(left: IntegerValue, right: IntegerValue) -> Ordering {
    match (left, right) {
        (IntegerValue::Signed(left), IntegerValue::Signed(right)) => left.cmp(&right),
        (IntegerValue::Unsigned(left), IntegerValue::Unsigned(right)) => left.cmp(&right),
        (IntegerValue::Signed(left), IntegerValue::Unsigned(right)) => {
            u64::try_from(left).map_or(Ordering::Less, |left| left.cmp(&right))
        }
        (IntegerValue::Unsigned(left), IntegerValue::Signed(right)) => {
            u64::try_from(right).map_or(Ordering::Greater, |right| left.cmp(&right))
        }
    }
}

/// Integer representation of JSON numbers for exact comparison.
#[derive(Clone, Copy)]
enum IntegerValue {
    /// Fits in `i64`.
    Signed(i64),
    /// Only fits in `u64`.
    Unsigned(u64),
}

/// Extracts integer values; decimals return `None`.
fn integer_value(value: &Number) -> Option<IntegerValue> {
    if let Some(value) = value.as_i64() {
        return Some(IntegerValue::Signed(value));
    }
    value.as_u64().map(IntegerValue::Unsigned)
}

/// Builds a type mismatch error for an operand label.
fn type_mismatch(operand: String, expected: &str) -> EvaluationError {
    EvaluationError::TypeMismatch {
        operand,
        expected: expected.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
