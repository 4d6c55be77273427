// crud-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Token Fingerprints
// Description: SHA-256 fingerprints for audit records.
// Purpose: Correlate audit events per token without recording the token.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Audit events carry a lowercase hex SHA-256 digest of the bearer token
//! instead of the token itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Fingerprints
// ============================================================================

/// Returns the lowercase hex SHA-256 digest of a token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex_encode(&hasher.finalize())
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
