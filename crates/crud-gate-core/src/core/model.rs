// crud-gate-core/src/core/model.rs
// ============================================================================
// Module: CRUD Request Bodies
// Description: Decoded request shapes handed over by the transport layer.
// Purpose: Provide the data contracts the gate derives evaluation args from.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each body names an operation mode (`op`, e.g. `one` or `all`) and carries
//! the filter, document, update, or pipeline the rules may inspect. Field
//! names follow the gateway wire format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Single-Collection Requests
// ============================================================================

/// Body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Document or array of documents to insert.
    #[serde(default)]
    pub doc: Value,
    /// Operation mode.
    #[serde(default)]
    pub op: String,
}

/// Body of a read request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Filter selecting documents.
    #[serde(default)]
    pub find: Map<String, Value>,
    /// Operation mode.
    #[serde(default)]
    pub op: String,
    /// Projection, sort, and pagination options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ReadOptions>,
}

/// Options of a read request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Field projection (`1` include, `0` exclude).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub select: BTreeMap<String, i32>,
    /// Sort order (`1` ascending, `-1` descending).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sort: BTreeMap<String, i32>,
    /// Number of documents to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    /// Maximum number of documents to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Field to return distinct values of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<String>,
}

/// Body of an update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Filter selecting documents.
    #[serde(default)]
    pub find: Map<String, Value>,
    /// Operation mode.
    #[serde(default)]
    pub op: String,
    /// Update instructions, e.g. `{"$set": {...}}`.
    #[serde(default)]
    pub update: Map<String, Value>,
}

/// Body of a delete request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Filter selecting documents.
    #[serde(default)]
    pub find: Map<String, Value>,
    /// Operation mode.
    #[serde(default)]
    pub op: String,
}

/// Body of an aggregate request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Aggregation pipeline.
    #[serde(default)]
    pub pipe: Value,
    /// Operation mode.
    #[serde(default)]
    pub op: String,
}

// ============================================================================
// SECTION: Batch Requests
// ============================================================================

/// One write inside a batch, tagged with its collection and request type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Target collection.
    pub col: String,
    /// Document for create items.
    #[serde(default)]
    pub doc: Value,
    /// Operation mode.
    #[serde(default)]
    pub op: String,
    /// Filter for update/delete items.
    #[serde(default)]
    pub find: Map<String, Value>,
    /// Update instructions for update items.
    #[serde(default)]
    pub update: Map<String, Value>,
    /// Request type: `create`, `update`, or `delete`.
    #[serde(rename = "type")]
    pub request_type: String,
}

/// Ordered batch of writes across collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Items in execution order.
    #[serde(default)]
    pub reqs: Vec<BatchItem>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
