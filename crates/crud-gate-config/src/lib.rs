// crud-gate-config/src/lib.rs
// ============================================================================
// Module: CRUD Gate Config Library
// Description: Gate configuration model, loading, and validation.
// Purpose: Single source of truth for crud-gate.toml semantics.
// Dependencies: crud-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `crud-gate-config` loads the signing secret, CRUD rule tree, and file
//! store rules from TOML or JSON and validates them before they reach a
//! [`crud_gate_core::Gate`]. Invalid configuration fails closed.
//!
//! Security posture: config inputs are untrusted; secrets are redacted from
//! debug output.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
