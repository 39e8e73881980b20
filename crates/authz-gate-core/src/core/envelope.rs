// crates/authz-gate-core/src/core/envelope.rs
// ============================================================================
// Module: Authz Gate Result Envelope
// Description: Uniform `{success, data}` result shape and gate failure types.
// Purpose: Ensure the transport layer never sees an unwrapped gate failure.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every guarded call ends in a [`ResultEnvelope`]. Success carries the
//! operation's value; failure carries the display string of a [`GateError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure reported by a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OperationError {
    /// Human-readable failure description.
    message: String,
}

impl OperationError {
    /// Creates an operation error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for OperationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for OperationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Reasons a guarded call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Params lack the routing marker field.
    #[error("No module pattern found")]
    NoModulePattern,
    /// Policy denied the call; the operation was not invoked.
    #[error("Unauthorized")]
    Unauthorized,
    /// The operation ran and failed.
    #[error(transparent)]
    Operation(#[from] OperationError),
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Uniform result returned to the dispatch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Whether the operation ran and completed.
    pub success: bool,
    /// Operation value on success; error description on failure.
    pub data: Value,
}

impl ResultEnvelope {
    /// Wraps a successful operation value.
    #[must_use]
    pub const fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Wraps a failure description.
    #[must_use]
    pub fn failure(error: &GateError) -> Self {
        Self {
            success: false,
            data: Value::String(error.to_string()),
        }
    }
}

impl From<Result<Value, GateError>> for ResultEnvelope {
    fn from(result: Result<Value, GateError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(&error),
        }
    }
}
