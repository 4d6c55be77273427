// crud-gate-core/src/core/operation.rs
// ============================================================================
// Module: Operation Types
// Description: Closed sets of data and file operations subject to rules.
// Purpose: Give rule lookups a typed key instead of free-form strings.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Operation tags identify the kind of access being attempted. Both sets are
//! fixed; unknown names fail to parse rather than mapping to a default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Operation Type
// ============================================================================

/// Kind of data access attempted against a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Insert one or more documents.
    Create,
    /// Read documents matching a filter.
    Read,
    /// Update documents matching a filter.
    Update,
    /// Delete documents matching a filter.
    Delete,
    /// Run an aggregation pipeline.
    Aggregate,
    /// Run an ordered batch of writes.
    Batch,
}

impl OperationType {
    /// All operation types in declaration order.
    pub const ALL: [Self; 6] =
        [Self::Create, Self::Read, Self::Update, Self::Delete, Self::Aggregate, Self::Batch];

    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Aggregate => "aggregate",
            Self::Batch => "batch",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = ParseOperationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == value)
            .ok_or_else(|| ParseOperationError(value.to_string()))
    }
}

// ============================================================================
// SECTION: File Operation
// ============================================================================

/// Kind of access attempted against the file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    /// Upload a file or create a folder.
    Create,
    /// Download a file or list a folder.
    Read,
    /// Delete a file or folder.
    Delete,
}

impl FileOperation {
    /// All file operations in declaration order.
    pub const ALL: [Self; 3] = [Self::Create, Self::Read, Self::Delete];

    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileOperation {
    type Err = ParseOperationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == value)
            .ok_or_else(|| ParseOperationError(value.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Unknown operation name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation: {0}")]
pub struct ParseOperationError(pub String);

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::FileOperation;
    use super::OperationType;

    #[test]
    fn operation_names_round_trip() {
        for op in OperationType::ALL {
            assert_eq!(op.as_str().parse::<OperationType>(), Ok(op));
        }
        for op in FileOperation::ALL {
            assert_eq!(op.as_str().parse::<FileOperation>(), Ok(op));
        }
    }

    #[test]
    fn unknown_operation_names_are_rejected() {
        assert!("READ".parse::<OperationType>().is_err());
        assert!("upsert".parse::<OperationType>().is_err());
        assert!("update".parse::<FileOperation>().is_err());
    }
}
