// crates/authz-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Authz Gate Policy Digests
// Description: RFC 8785 JSON canonicalization and policy content hashing.
// Purpose: Identify imported policy trees by a stable content hash.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Policy trees are hashed over their RFC 8785 (JCS) canonical form so two
//! exports of the same tree always produce the same digest, whatever key order
//! the source document used. Audit events carry the digest of the tree that
//! was live when a decision was made.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Policy Digest
// ============================================================================

/// Digest algorithms supported for policy content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    /// SHA-256 over canonical JSON bytes.
    Sha256,
}

/// Content digest of a canonicalized policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDigest {
    /// Algorithm used to compute the digest.
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl fmt::Display for PolicyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.algorithm {
            DigestAlgorithm::Sha256 => write!(f, "sha256:{}", self.value),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when canonicalizing policy content.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns RFC 8785 canonical JSON bytes for a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Computes the SHA-256 digest of a value's canonical JSON form.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn policy_digest<T: Serialize + ?Sized>(value: &T) -> Result<PolicyDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    let digest = Sha256::digest(&bytes);
    Ok(PolicyDigest {
        algorithm: DigestAlgorithm::Sha256,
        value: hex_encode(&digest),
    })
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
