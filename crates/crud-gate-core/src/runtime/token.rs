// crud-gate-core/src/runtime/token.rs
// ============================================================================
// Module: Token Service
// Description: HS256 bearer token issuing and verification.
// Purpose: Turn a shared secret into signed claim tokens and back.
// Dependencies: base64, jsonwebtoken, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Tokens are compact JWTs signed with HMAC-SHA256 over a shared secret. The
//! header algorithm is read before any signature work, so `none` and every
//! algorithm other than `HS256` are rejected outright. `exp`, `nbf`, and `iat`
//! are honored when they hold numbers and ignored otherwise, so any claim map
//! that issues also verifies. An empty secret can neither issue nor verify.
//!
//! Security posture: tokens are untrusted input; raw tokens never appear in
//! error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use jsonwebtoken::errors::ErrorKind;
use serde_json::Value;
use thiserror::Error;

use crate::core::Claims;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted token or authorization header size in bytes.
pub const MAX_TOKEN_BYTES: usize = 8 * 1024;
/// The only accepted header algorithm.
const SIGNING_ALGORITHM: &str = "HS256";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Token issuing and verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token is not a well-formed compact JWT.
    #[error("malformed token: {0}")]
    Malformed(String),
    /// The signature does not match the current secret.
    #[error("token signature is invalid")]
    SignatureInvalid,
    /// The header names an algorithm other than HS256.
    #[error("token algorithm {found} is not accepted")]
    AlgorithmMismatch {
        /// Algorithm named by the token header.
        found: String,
    },
    /// The `exp` claim is in the past.
    #[error("token has expired")]
    Expired,
    /// The `nbf` claim is in the future.
    #[error("token is not yet valid")]
    NotYetValid,
    /// The `iat` claim is in the future.
    #[error("token was issued in the future")]
    IssuedInFuture,
    /// A token could not be produced.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Maps a `jsonwebtoken` failure onto the gate's token errors.
    fn from_jwt(err: &jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => Self::SignatureInvalid,
            ErrorKind::InvalidAlgorithm => Self::AlgorithmMismatch {
                found: "unrecognized".to_string(),
            },
            _ => Self::Malformed(err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Token Service
// ============================================================================

/// Issues and verifies HS256 tokens with one shared secret.
///
/// # Invariants
/// - Immutable once built; rotating the secret means building a new service.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenService {
    /// Shared HMAC secret.
    secret: String,
}

impl TokenService {
    /// Creates a service for the given secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns true when a non-empty secret is configured.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Signs the claims into a compact HS256 token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] when no secret is configured or encoding fails.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        if !self.has_secret() {
            return Err(TokenError::Signing("no signing secret configured".to_string()));
        }
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the token is malformed, names another
    /// algorithm, carries a bad signature, or is outside its validity window.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_BYTES {
            return Err(TokenError::Malformed("token exceeds size limit".to_string()));
        }
        let found = header_algorithm(token)?;
        if found != SIGNING_ALGORITHM {
            return Err(TokenError::AlgorithmMismatch {
                found,
            });
        }
        if token.split('.').any(str::is_empty) {
            return Err(TokenError::Malformed("token contains an empty segment".to_string()));
        }
        if !self.has_secret() {
            return Err(TokenError::SignatureInvalid);
        }
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation(),
        )
        .map_err(|err| TokenError::from_jwt(&err))?;
        check_time_claims(&data.claims, unix_now()?)?;
        Ok(data.claims)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService").field("secret", &"<redacted>").finish()
    }
}

// ============================================================================
// SECTION: Bearer Headers
// ============================================================================

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] when the header is oversized, uses
/// another scheme, or carries no token.
pub fn parse_bearer_header(header: &str) -> Result<String, TokenError> {
    if header.len() > MAX_TOKEN_BYTES {
        return Err(TokenError::Malformed("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(TokenError::Malformed("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the `alg` field of the token header without verifying anything.
fn header_algorithm(token: &str) -> Result<String, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, _, _] = segments.as_slice() else {
        return Err(TokenError::Malformed("token must have three segments".to_string()));
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed("header is not base64url".to_string()))?;
    let header: Value = serde_json::from_slice(&bytes)
        .map_err(|_| TokenError::Malformed("header is not JSON".to_string()))?;
    header
        .get("alg")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TokenError::Malformed("header has no alg".to_string()))
}

/// Builds the verification settings: HS256 signature only.
///
/// Time claims are checked by [`check_time_claims`] instead, which skips
/// non-numeric values rather than rejecting them.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}

/// Returns the current Unix time in whole seconds.
fn unix_now() -> Result<f64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64().floor())
        .map_err(|_| TokenError::Malformed("system clock is before the unix epoch".to_string()))
}

/// Rejects tokens outside their validity window.
///
/// Only numeric `exp`, `nbf`, and `iat` values take part; a token is valid
/// while `nbf <= now`, `iat <= now`, and `now <= exp`.
fn check_time_claims(claims: &Claims, now: f64) -> Result<(), TokenError> {
    let numeric = |key: &str| claims.get(key).and_then(Value::as_f64);
    if numeric("exp").is_some_and(|exp| now > exp) {
        return Err(TokenError::Expired);
    }
    if numeric("nbf").is_some_and(|nbf| now < nbf) {
        return Err(TokenError::NotYetValid);
    }
    if numeric("iat").is_some_and(|iat| now < iat) {
        return Err(TokenError::IssuedInFuture);
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
