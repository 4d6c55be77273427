// crud-gate-core/src/core/rule.rs
// ============================================================================
// Module: Access Rule Tree
// Description: Closed rule union, match operands, and load-time validation.
// Purpose: Define the policy language evaluated for every data operation.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Rule`] is a node in a policy tree. Leaf kinds either decide outright
//! (`allow`, `deny`), compare two operands (`match`), or hand
//! the decision to a registered delegate (`webhook`). Combinators (`and`, `or`,
//! `not`) compose children. Unrecognized kinds deserialize to
//! [`Rule::Unsupported`], which never allows and never passes validation.
//!
//! Operands are JSON values. A string starting with `args.` is a field path
//! into the evaluation arguments; anything else is a literal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum nesting depth of a rule tree.
pub const MAX_RULE_DEPTH: usize = 32;
/// Prefix marking an operand as a field path.
const FIELD_PREFIX: &str = "args.";
/// Maximum length of a field path.
const MAX_FIELD_PATH_LENGTH: usize = 512;

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Policy tree node.
///
/// # Invariants
/// - `and`/`or` carry at least one clause once validated.
/// - Rules are immutable after load; reloads replace whole trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Public access. Also skips token verification during authentication.
    Allow,
    /// Never allowed.
    Deny,
    /// Typed comparison between two operands.
    Match(MatchRule),
    /// Allowed when every clause allows.
    And {
        /// Child rules.
        clauses: Vec<Self>,
    },
    /// Allowed when any clause allows.
    Or {
        /// Child rules.
        clauses: Vec<Self>,
    },
    /// Allowed when the clause denies.
    Not {
        /// Negated child rule.
        clause: Box<Self>,
    },
    /// Decision delegated to a registered [`crate::RuleDelegate`].
    Webhook {
        /// Delegate endpoint identifier.
        url: String,
    },
    /// Any rule kind this build does not understand.
    #[serde(other)]
    Unsupported,
}

impl Rule {
    /// Builds a match rule.
    #[must_use]
    pub const fn matches(eval: Comparator, value_type: ValueType, f1: Operand, f2: Operand) -> Self {
        Self::Match(MatchRule {
            eval,
            value_type,
            f1,
            f2,
        })
    }

    /// Builds an `and` combinator.
    #[must_use]
    pub const fn and(clauses: Vec<Self>) -> Self {
        Self::And {
            clauses,
        }
    }

    /// Builds an `or` combinator.
    #[must_use]
    pub const fn or(clauses: Vec<Self>) -> Self {
        Self::Or {
            clauses,
        }
    }

    /// Builds a `not` combinator.
    #[must_use]
    pub fn negate(clause: Self) -> Self {
        Self::Not {
            clause: Box::new(clause),
        }
    }

    /// Builds a webhook delegate rule.
    #[must_use]
    pub fn webhook(url: impl Into<String>) -> Self {
        Self::Webhook {
            url: url.into(),
        }
    }

    /// Returns the rule kind label used in config and diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Match(_) => "match",
            Self::And {
                ..
            } => "and",
            Self::Or {
                ..
            } => "or",
            Self::Not {
                ..
            } => "not",
            Self::Webhook {
                ..
            } => "webhook",
            Self::Unsupported => "unsupported",
        }
    }

    /// Returns true for the public `allow` rule.
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Validates the whole tree, visiting every child eagerly.
    ///
    /// # Errors
    ///
    /// Returns [`RuleValidationError`] naming the first offending node.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        self.validate_at(1)
    }

    /// Validates this node at the given depth.
    fn validate_at(&self, depth: usize) -> Result<(), RuleValidationError> {
        if depth > MAX_RULE_DEPTH {
            return Err(RuleValidationError::TooDeep {
                max_depth: MAX_RULE_DEPTH,
            });
        }
        match self {
            Self::Allow | Self::Deny => Ok(()),
            Self::Match(rule) => rule.validate(),
            Self::And {
                clauses,
            }
            | Self::Or {
                clauses,
            } => {
                if clauses.is_empty() {
                    return Err(RuleValidationError::EmptyClauses {
                        kind: self.kind(),
                    });
                }
                for (index, clause) in clauses.iter().enumerate() {
                    clause
                        .validate_at(depth + 1)
                        .map_err(|err| err.at(format!("{}[{index}]", self.kind())))?;
                }
                Ok(())
            }
            Self::Not {
                clause,
            } => clause.validate_at(depth + 1).map_err(|err| err.at("not")),
            Self::Webhook {
                url,
            } => {
                if url.trim().is_empty() {
                    return Err(RuleValidationError::MissingWebhookUrl);
                }
                Ok(())
            }
            Self::Unsupported => Err(RuleValidationError::UnsupportedRule),
        }
    }
}

// ============================================================================
// SECTION: Match Rule
// ============================================================================

/// Parameters of a `match` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRule {
    /// Comparator applied as `f1 <eval> f2`.
    pub eval: Comparator,
    /// Value type both operands must carry.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Left operand.
    pub f1: Operand,
    /// Right operand.
    pub f2: Operand,
}

impl MatchRule {
    /// Validates comparator/type compatibility and literal operand types.
    fn validate(&self) -> Result<(), RuleValidationError> {
        if self.eval.is_ordering() && self.value_type == ValueType::Bool {
            return Err(RuleValidationError::InvalidMatch(format!(
                "comparator {} cannot order bool values",
                self.eval
            )));
        }
        if let Operand::Literal(value) = &self.f1 {
            if !self.value_type.accepts(value) {
                return Err(RuleValidationError::InvalidMatch(format!(
                    "f1 literal is not a {} value",
                    self.value_type
                )));
            }
        }
        if let Operand::Literal(value) = &self.f2 {
            if self.eval.is_membership() {
                let Value::Array(items) = value else {
                    return Err(RuleValidationError::InvalidMatch(format!(
                        "comparator {} requires an array for f2",
                        self.eval
                    )));
                };
                if !items.iter().all(|item| self.value_type.accepts(item)) {
                    return Err(RuleValidationError::InvalidMatch(format!(
                        "f2 array must only hold {} values",
                        self.value_type
                    )));
                }
            } else if !self.value_type.accepts(value) {
                return Err(RuleValidationError::InvalidMatch(format!(
                    "f2 literal is not a {} value",
                    self.value_type
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Comparator
// ============================================================================

/// Comparison applied by a `match` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// Equal.
    #[serde(rename = "==")]
    Equals,
    /// Not equal.
    #[serde(rename = "!=")]
    NotEquals,
    /// Strictly greater.
    #[serde(rename = ">")]
    GreaterThan,
    /// Greater or equal.
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    /// Strictly less.
    #[serde(rename = "<")]
    LessThan,
    /// Less or equal.
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// Member of an array.
    #[serde(rename = "in")]
    In,
    /// Not a member of an array.
    #[serde(rename = "notIn")]
    NotIn,
}

impl Comparator {
    /// Returns the config spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::In => "in",
            Self::NotIn => "notIn",
        }
    }

    /// Returns true for `>`, `>=`, `<`, `<=`.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual
        )
    }

    /// Returns true for `in` and `notIn`.
    #[must_use]
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Value Type
// ============================================================================

/// Declared operand type of a `match` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// JSON string.
    String,
    /// JSON number.
    Number,
    /// JSON boolean.
    Bool,
}

impl ValueType {
    /// Returns the config spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
        }
    }

    /// Returns true when the value carries this type.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Bool, Value::Bool(_))
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Operands
// ============================================================================

/// Operand of a `match` rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Value read from the evaluation arguments.
    Field(FieldPath),
    /// Constant value.
    Literal(Value),
}

impl Operand {
    /// Builds a field operand from an `args.` path.
    ///
    /// # Errors
    ///
    /// Returns [`RuleValidationError::InvalidFieldPath`] when the path is malformed.
    pub fn field(path: &str) -> Result<Self, RuleValidationError> {
        FieldPath::parse(path).map(Self::Field)
    }

    /// Builds a literal operand.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Classifies a raw JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RuleValidationError::InvalidFieldPath`] for malformed `args.` strings.
    pub fn from_value(value: Value) -> Result<Self, RuleValidationError> {
        match value {
            Value::String(text) if text.starts_with(FIELD_PREFIX) => Self::field(&text),
            other => Ok(Self::Literal(other)),
        }
    }

    /// Returns a short label for diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Field(path) => path.as_str().to_string(),
            Self::Literal(_) => "literal".to_string(),
        }
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Field(path) => serializer.serialize_str(path.as_str()),
            Self::Literal(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Operand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Dotted path into the evaluation arguments, written `args.<segment>...`.
///
/// # Invariants
/// - At least one segment; no segment is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    /// Original spelling, including the `args.` prefix.
    raw: String,
    /// Segments after the prefix.
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses an `args.`-prefixed path.
    ///
    /// # Errors
    ///
    /// Returns [`RuleValidationError::InvalidFieldPath`] when the prefix is
    /// missing, a segment is empty, or the path is too long.
    pub fn parse(raw: &str) -> Result<Self, RuleValidationError> {
        if raw.len() > MAX_FIELD_PATH_LENGTH {
            return Err(RuleValidationError::InvalidFieldPath(
                "field path exceeds max length".to_string(),
            ));
        }
        let Some(rest) = raw.strip_prefix(FIELD_PREFIX) else {
            return Err(RuleValidationError::InvalidFieldPath(format!(
                "{raw} must start with {FIELD_PREFIX}"
            )));
        };
        let segments: Vec<String> = rest.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(RuleValidationError::InvalidFieldPath(format!(
                "{raw} contains an empty segment"
            )));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the original spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the segments after `args.`.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural rule errors detected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleValidationError {
    /// An `and`/`or` node has no clauses.
    #[error("{kind} rule requires at least one clause")]
    EmptyClauses {
        /// Combinator kind.
        kind: &'static str,
    },
    /// A `match` node is inconsistent.
    #[error("invalid match rule: {0}")]
    InvalidMatch(String),
    /// A field operand is malformed.
    #[error("invalid field path: {0}")]
    InvalidFieldPath(String),
    /// A `webhook` node has no url.
    #[error("webhook rule requires a non-empty url")]
    MissingWebhookUrl,
    /// The rule kind is not recognized.
    #[error("unsupported rule kind")]
    UnsupportedRule,
    /// The tree nests deeper than [`MAX_RULE_DEPTH`].
    #[error("rule tree exceeds max depth {max_depth}")]
    TooDeep {
        /// Maximum allowed depth.
        max_depth: usize,
    },
    /// A nested error annotated with its location.
    #[error("{location}: {error}")]
    At {
        /// Location label, e.g. `mongo/users/read` or `and[1]`.
        location: String,
        /// Underlying error.
        error: Box<Self>,
    },
}

impl RuleValidationError {
    /// Wraps the error with a location label.
    #[must_use]
    pub fn at(self, location: impl Into<String>) -> Self {
        Self::At {
            location: location.into(),
            error: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping location wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::At {
                error, ..
            } => error.root(),
            other => other,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
