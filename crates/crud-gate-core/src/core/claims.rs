// crud-gate-core/src/core/claims.rs
// ============================================================================
// Module: Caller Claims
// Description: Key/value caller attributes carried inside a signed token.
// Purpose: Wrap the JSON claim map so callers cannot confuse it with request data.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Claims have no enforced schema; keys are defined by the configured rules.
//! Values are tagged JSON values so rule comparisons stay typed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Caller identity attributes decoded from a verified token.
///
/// # Invariants
/// - Always a JSON object at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns a copy with the claim set, replacing any prior value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a claim and returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the claim value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true when no claims are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates claims in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrows the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the claims and returns the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Claims> for Value {
    fn from(claims: Claims) -> Self {
        Self::Object(claims.0)
    }
}

impl FromIterator<(String, Value)> for Claims {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use serde_json::json;

    use super::Claims;

    #[test]
    fn with_replaces_existing_values() {
        let claims = Claims::new().with("id", "u1").with("id", "u2");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims.get("id"), Some(&json!("u2")));
    }

    #[test]
    fn serializes_as_plain_object() {
        let claims = Claims::new().with("role", "admin").with("level", 3);
        let value = serde_json::to_value(&claims).expect("serialize claims");
        assert_eq!(value, json!({"level": 3, "role": "admin"}));
    }
}
