// crud-gate-core/src/core/args.rs
// ============================================================================
// Module: Evaluation Arguments
// Description: Argument object that rule field paths resolve against.
// Purpose: Combine caller claims with request body fields under fixed keys.
// Dependencies: crate::core::{claims, model, rule}, serde_json
// ============================================================================

//! ## Overview
//! Evaluation arguments are a JSON object with the caller claims under `auth`
//! and request fields under `find`, `update`, `doc`, `pipe`, and `params`. A
//! rule operand `args.find.owner` reads `find.owner` from this object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::claims::Claims;
use crate::core::model::AggregateRequest;
use crate::core::model::BatchItem;
use crate::core::model::CreateRequest;
use crate::core::model::DeleteRequest;
use crate::core::model::ReadRequest;
use crate::core::model::UpdateRequest;
use crate::core::rule::FieldPath;

// ============================================================================
// SECTION: Argument Keys
// ============================================================================

/// Key holding caller claims.
pub const AUTH_KEY: &str = "auth";
/// Key holding the request filter.
pub const FIND_KEY: &str = "find";
/// Key holding update instructions.
pub const UPDATE_KEY: &str = "update";
/// Key holding the created document.
pub const DOC_KEY: &str = "doc";
/// Key holding the aggregation pipeline.
pub const PIPE_KEY: &str = "pipe";
/// Key holding path parameters bound by file rules.
pub const PARAMS_KEY: &str = "params";

// ============================================================================
// SECTION: Evaluation Arguments
// ============================================================================

/// Argument object evaluated by rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationArgs {
    /// Root object field paths resolve against.
    root: Map<String, Value>,
}

impl EvaluationArgs {
    /// Creates arguments holding only the caller claims.
    #[must_use]
    pub fn new(claims: &Claims) -> Self {
        let mut root = Map::new();
        root.insert(AUTH_KEY.to_string(), Value::Object(claims.as_map().clone()));
        Self {
            root,
        }
    }

    /// Returns a copy with an arbitrary top-level field set.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.root.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with the request filter set.
    #[must_use]
    pub fn with_find(self, find: Map<String, Value>) -> Self {
        self.with_field(FIND_KEY, Value::Object(find))
    }

    /// Returns a copy with update instructions set.
    #[must_use]
    pub fn with_update(self, update: Map<String, Value>) -> Self {
        self.with_field(UPDATE_KEY, Value::Object(update))
    }

    /// Returns a copy with the created document set.
    #[must_use]
    pub fn with_doc(self, doc: Value) -> Self {
        self.with_field(DOC_KEY, doc)
    }

    /// Returns a copy with the aggregation pipeline set.
    #[must_use]
    pub fn with_pipe(self, pipe: Value) -> Self {
        self.with_field(PIPE_KEY, pipe)
    }

    /// Returns a copy with path parameters set.
    #[must_use]
    pub fn with_params(self, params: Map<String, Value>) -> Self {
        self.with_field(PARAMS_KEY, Value::Object(params))
    }

    /// Builds arguments for a create request.
    #[must_use]
    pub fn for_create(claims: &Claims, request: &CreateRequest) -> Self {
        Self::new(claims).with_doc(request.doc.clone())
    }

    /// Builds arguments for a read request.
    #[must_use]
    pub fn for_read(claims: &Claims, request: &ReadRequest) -> Self {
        Self::new(claims).with_find(request.find.clone())
    }

    /// Builds arguments for an update request.
    #[must_use]
    pub fn for_update(claims: &Claims, request: &UpdateRequest) -> Self {
        Self::new(claims).with_find(request.find.clone()).with_update(request.update.clone())
    }

    /// Builds arguments for a delete request.
    #[must_use]
    pub fn for_delete(claims: &Claims, request: &DeleteRequest) -> Self {
        Self::new(claims).with_find(request.find.clone())
    }

    /// Builds arguments for an aggregate request.
    #[must_use]
    pub fn for_aggregate(claims: &Claims, request: &AggregateRequest) -> Self {
        Self::new(claims).with_pipe(request.pipe.clone())
    }

    /// Builds arguments for one batch item.
    #[must_use]
    pub fn for_batch_item(claims: &Claims, item: &BatchItem) -> Self {
        Self::new(claims)
            .with_doc(item.doc.clone())
            .with_find(item.find.clone())
            .with_update(item.update.clone())
    }

    /// Resolves a field path, walking objects by key and arrays by index.
    #[must_use]
    pub fn resolve(&self, path: &FieldPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get(first)?;
        for segment in rest {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Borrows the root object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }
}

impl From<EvaluationArgs> for Value {
    fn from(args: EvaluationArgs) -> Self {
        Self::Object(args.root)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
