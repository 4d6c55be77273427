// crud-gate-core/src/core/rules.rs
// ============================================================================
// Module: Rule Store Layout
// Description: Database/collection/operation rule tree and file rule table.
// Purpose: Resolve the rule for an operation, denying when none is configured.
// Dependencies: crate::core::{operation, rule}, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`RuleSet`] maps database identifier → collection → operation → [`Rule`].
//! Lookups fail with [`RuleNotFound`] when any level is absent; a missing rule
//! never implies access. The [`FileRuleSet`] is an independent table keyed by
//! path prefix and is swapped together with the CRUD tree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::operation::FileOperation;
use crate::core::operation::OperationType;
use crate::core::rule::Rule;
use crate::core::rule::RuleValidationError;

// ============================================================================
// SECTION: CRUD Rule Set
// ============================================================================

/// Rules for every configured database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    /// Rules keyed by database identifier.
    databases: BTreeMap<String, DatabaseRules>,
}

/// Rules for the collections of one database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRules {
    /// Rules keyed by collection name.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionRules>,
}

/// Rules for the operations on one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionRules {
    /// Rules keyed by operation.
    #[serde(default)]
    pub rules: BTreeMap<OperationType, Rule>,
}

impl RuleSet {
    /// Creates an empty rule set. Every lookup against it fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the rule installed.
    #[must_use]
    pub fn with_rule(
        mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        operation: OperationType,
        rule: Rule,
    ) -> Self {
        self.insert(database, collection, operation, rule);
        self
    }

    /// Installs a rule and returns the one it replaced, if any.
    pub fn insert(
        &mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        operation: OperationType,
        rule: Rule,
    ) -> Option<Rule> {
        self.databases
            .entry(database.into())
            .or_default()
            .collections
            .entry(collection.into())
            .or_default()
            .rules
            .insert(operation, rule)
    }

    /// Resolves the rule for an operation.
    ///
    /// # Errors
    ///
    /// Returns [`RuleNotFound`] when the database, collection, or operation is absent.
    pub fn lookup(
        &self,
        database: &str,
        collection: &str,
        operation: OperationType,
    ) -> Result<&Rule, RuleNotFound> {
        self.databases
            .get(database)
            .and_then(|db| db.collections.get(collection))
            .and_then(|col| col.rules.get(&operation))
            .ok_or_else(|| RuleNotFound {
                database: database.to_string(),
                collection: collection.to_string(),
                operation,
            })
    }

    /// Returns the configured databases.
    #[must_use]
    pub const fn databases(&self) -> &BTreeMap<String, DatabaseRules> {
        &self.databases
    }

    /// Returns the total number of configured rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.databases
            .values()
            .flat_map(|db| db.collections.values())
            .map(|col| col.rules.len())
            .sum()
    }

    /// Returns true when no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Validates every rule tree in the set.
    ///
    /// # Errors
    ///
    /// Returns [`RuleValidationError`] located at `database/collection/operation`.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        for (database, db_rules) in &self.databases {
            for (collection, col_rules) in &db_rules.collections {
                for (operation, rule) in &col_rules.rules {
                    rule.validate()
                        .map_err(|err| err.at(format!("{database}/{collection}/{operation}")))?;
                }
            }
        }
        Ok(())
    }
}

/// No rule is configured for the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no rule configured for {database}/{collection}/{operation}")]
pub struct RuleNotFound {
    /// Requested database identifier.
    pub database: String,
    /// Requested collection name.
    pub collection: String,
    /// Requested operation.
    pub operation: OperationType,
}

// ============================================================================
// SECTION: File Rules
// ============================================================================

/// File store section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStore {
    /// Whether file rules are active.
    #[serde(default)]
    pub enabled: bool,
    /// File rules in declaration order.
    #[serde(default)]
    pub rules: FileRuleSet,
}

impl FileStore {
    /// Returns the active rule table, or `None` when the store is disabled.
    #[must_use]
    pub fn into_active_rules(self) -> Option<FileRuleSet> {
        self.enabled.then_some(self.rules)
    }
}

/// Rules for one path prefix.
///
/// Prefix segments starting with `:` match any single path segment and bind
/// it as a parameter, e.g. `/users/:user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRule {
    /// Path prefix this rule applies to.
    pub prefix: String,
    /// Rules keyed by file operation.
    #[serde(default)]
    pub rules: BTreeMap<FileOperation, Rule>,
}

/// Ordered file rule table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRuleSet {
    /// File rules in declaration order.
    entries: Vec<FileRule>,
}

/// Resolved file rule together with bound path parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMatch<'a> {
    /// Matching rule.
    pub rule: &'a Rule,
    /// Matching prefix.
    pub prefix: &'a str,
    /// Parameters bound from `:name` prefix segments.
    pub params: Map<String, Value>,
}

impl FileRuleSet {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns a copy with the rule appended.
    #[must_use]
    pub fn with_rule(mut self, rule: FileRule) -> Self {
        self.entries.push(rule);
        self
    }

    /// Returns the file rules in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[FileRule] {
        &self.entries
    }

    /// Resolves the rule for a path using the longest matching prefix.
    ///
    /// Ties resolve to the earliest declared prefix.
    ///
    /// # Errors
    ///
    /// Returns [`FileRuleNotFound`] when no prefix matches or the matching
    /// prefix has no rule for the operation.
    pub fn lookup(&self, path: &str, operation: FileOperation) -> Result<FileMatch<'_>, FileRuleNotFound> {
        let path_segments = split_path(path);
        let mut best: Option<(usize, &FileRule, Map<String, Value>)> = None;
        for entry in &self.entries {
            let prefix_segments = split_path(&entry.prefix);
            let Some(params) = match_prefix(&prefix_segments, &path_segments) else {
                continue;
            };
            let longer = best.as_ref().is_none_or(|(len, _, _)| prefix_segments.len() > *len);
            if longer {
                best = Some((prefix_segments.len(), entry, params));
            }
        }
        let not_found = || FileRuleNotFound {
            path: path.to_string(),
            operation,
        };
        let (_, entry, params) = best.ok_or_else(not_found)?;
        let rule = entry.rules.get(&operation).ok_or_else(not_found)?;
        Ok(FileMatch {
            rule,
            prefix: &entry.prefix,
            params,
        })
    }

    /// Validates prefixes and every rule tree in the table.
    ///
    /// # Errors
    ///
    /// Returns [`RuleValidationError`] located at `files:<prefix>/<operation>`.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        for entry in &self.entries {
            if !entry.prefix.starts_with('/') {
                return Err(RuleValidationError::InvalidFieldPath(format!(
                    "file prefix {} must start with /",
                    entry.prefix
                ))
                .at(format!("files:{}", entry.prefix)));
            }
            for (operation, rule) in &entry.rules {
                rule.validate().map_err(|err| err.at(format!("files:{}/{operation}", entry.prefix)))?;
            }
        }
        Ok(())
    }
}

/// No file rule covers the requested path and operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no file rule configured for {operation} on {path}")]
pub struct FileRuleNotFound {
    /// Requested path.
    pub path: String,
    /// Requested operation.
    pub operation: FileOperation,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a path into non-empty segments.
fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Matches prefix segments against path segments, binding `:name` parameters.
fn match_prefix(prefix: &[&str], path: &[&str]) -> Option<Map<String, Value>> {
    if prefix.len() > path.len() {
        return None;
    }
    let mut params = Map::new();
    for (expected, actual) in prefix.iter().zip(path) {
        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_string(), Value::String((*actual).to_string()));
        } else if expected != actual {
            return None;
        }
    }
    Some(params)
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

    use std::collections::BTreeMap;

    use serde_json::json;

    use super::FileRule;
    use super::FileRuleSet;
    use super::RuleSet;
    use crate::core::operation::FileOperation;
    use crate::core::operation::OperationType;
    use crate::core::rule::Rule;

    fn file_rule(prefix: &str, operation: FileOperation, rule: Rule) -> FileRule {
        FileRule {
            prefix: prefix.to_string(),
            rules: BTreeMap::from([(operation, rule)]),
        }
    }

    #[test]
    fn lookup_fails_at_every_missing_level() {
        let rules =
            RuleSet::new().with_rule("mongo", "users", OperationType::Read, Rule::Allow);
        assert!(rules.lookup("mongo", "users", OperationType::Read).is_ok());
        assert!(rules.lookup("sql", "users", OperationType::Read).is_err());
        assert!(rules.lookup("mongo", "orders", OperationType::Read).is_err());
        let err = rules.lookup("mongo", "users", OperationType::Delete).expect_err("missing op");
        assert_eq!(err.to_string(), "no rule configured for mongo/users/delete");
    }

    #[test]
    fn rule_set_deserializes_from_nested_maps() {
        let rules: RuleSet = serde_json::from_value(json!({
            "mongo": {"collections": {"users": {"rules": {
                "read": {"rule": "allow"},
                "delete": {"rule": "deny"}
            }}}}
        }))
        .expect("rule set");
        assert_eq!(rules.rule_count(), 2);
        assert_eq!(rules.lookup("mongo", "users", OperationType::Delete), Ok(&Rule::Deny));
    }

    #[test]
    fn validate_reports_rule_location() {
        let rules = RuleSet::new().with_rule(
            "mongo",
            "users",
            OperationType::Update,
            Rule::or(Vec::new()),
        );
        let err = rules.validate().expect_err("invalid");
        assert!(err.to_string().starts_with("mongo/users/update: "));
    }

    #[test]
    fn file_lookup_prefers_longest_prefix_and_binds_params() {
        let files = FileRuleSet::new()
            .with_rule(file_rule("/", FileOperation::Read, Rule::Deny))
            .with_rule(file_rule("/users/:user_id", FileOperation::Read, Rule::Allow));
        let found = files.lookup("/users/u1/avatar.png", FileOperation::Read).expect("match");
        assert_eq!(found.rule, &Rule::Allow);
        assert_eq!(found.params.get("user_id"), Some(&json!("u1")));

        let found = files.lookup("/public/logo.png", FileOperation::Read).expect("root");
        assert_eq!(found.rule, &Rule::Deny);
    }

    #[test]
    fn file_lookup_without_operation_rule_fails() {
        let files =
            FileRuleSet::new().with_rule(file_rule("/public", FileOperation::Read, Rule::Allow));
        assert!(files.lookup("/public/a.txt", FileOperation::Delete).is_err());
        assert!(files.lookup("/private/a.txt", FileOperation::Read).is_err());
    }

    #[test]
    fn file_prefixes_must_be_absolute() {
        let files =
            FileRuleSet::new().with_rule(file_rule("public", FileOperation::Read, Rule::Allow));
        assert!(files.validate().is_err());
    }
}
