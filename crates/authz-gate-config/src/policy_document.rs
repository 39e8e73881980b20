// crates/authz-gate-config/src/policy_document.rs
// ============================================================================
// Module: Authz Gate Policy Documents
// Description: Policy document file loading in JSON or TOML form.
// Purpose: Provide a file-backed policy source with hard size limits.
// Dependencies: authz-gate-core, serde_json, toml
// ============================================================================

//! ## Overview
//! Policy documents use the same grammar in either encoding. JSON is selected
//! by a `.json` extension; anything else is read as TOML, where the wildcard
//! key must be quoted:
//!
//! ```toml
//! [orders.invoices]
//! list = "auth"
//! "*" = ["admin"]
//! ```
//!
//! Loading only decodes the document. Grammar validation happens at import in
//! [`authz_gate_core::PolicyStore`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use authz_gate_core::PolicySource;
use authz_gate_core::PolicySourceError;
use serde_json::Value;

use crate::config::validate_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum policy document size in bytes.
pub const MAX_POLICY_DOCUMENT_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Encoding of a policy document file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    /// JSON object.
    Json,
    /// TOML table.
    Toml,
}

impl PolicyFormat {
    /// Selects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Decodes policy document text.
///
/// # Errors
///
/// Returns [`PolicySourceError::Parse`] when the text is not valid JSON/TOML.
pub fn parse_policy_document(
    content: &str,
    format: PolicyFormat,
) -> Result<Value, PolicySourceError> {
    match format {
        PolicyFormat::Json => {
            serde_json::from_str(content).map_err(|err| PolicySourceError::Parse(err.to_string()))
        }
        PolicyFormat::Toml => {
            toml::from_str(content).map_err(|err| PolicySourceError::Parse(err.to_string()))
        }
    }
}

/// Reads and decodes a policy document file.
///
/// # Errors
///
/// Returns [`PolicySourceError`] when the path is out of limits, the file
/// cannot be read, exceeds the size limit, is not UTF-8, or fails to decode.
pub fn read_policy_document(path: &Path) -> Result<Value, PolicySourceError> {
    validate_path(path).map_err(|err| PolicySourceError::Invalid(err.to_string()))?;
    let bytes = fs::read(path).map_err(|err| PolicySourceError::Io(err.to_string()))?;
    if bytes.len() > MAX_POLICY_DOCUMENT_SIZE {
        return Err(PolicySourceError::Invalid("policy document exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| PolicySourceError::Invalid("policy document must be utf-8".to_string()))?;
    parse_policy_document(content, PolicyFormat::from_path(path))
}

// ============================================================================
// SECTION: File Source
// ============================================================================

/// Policy source that re-reads a document file on every fetch.
#[derive(Debug, Clone)]
pub struct FilePolicySource {
    /// Document path.
    path: PathBuf,
}

impl FilePolicySource {
    /// Creates a source for `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
        }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PolicySource for FilePolicySource {
    fn fetch(&self) -> Result<Value, PolicySourceError> {
        read_policy_document(&self.path)
    }
}
