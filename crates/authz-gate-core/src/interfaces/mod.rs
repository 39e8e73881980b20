// crates/authz-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Authz Gate Interfaces
// Description: Contracts for guarded operations, policy sources, and audit sinks.
// Purpose: Define the seams between the gate runtime and its host.
// Dependencies: crate::core, async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces keep the gate runtime independent of transport, storage, and
//! logging backends. A host supplies a [`GateOperation`] per guarded command,
//! optionally a [`PolicySource`] for policy refreshes, and a [`GateAuditSink`]
//! for decision logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::audit::GateAuditEvent;
use crate::core::audit::PolicyAuditEvent;
use crate::core::envelope::OperationError;
use crate::core::identity::GateParams;

// ============================================================================
// SECTION: Guarded Operation
// ============================================================================

/// Unit of work protected by an authorization gate.
///
/// The gate invokes an operation only after the policy allowed the call, and
/// at most once per call. Cancellation and timeouts are the operation's own
/// concern.
#[async_trait]
pub trait GateOperation: Send + Sync {
    /// Runs the operation with decorated params.
    async fn invoke(&self, params: GateParams) -> Result<Value, OperationError>;
}

/// Adapts a synchronous closure into a [`GateOperation`].
pub struct FnOperation<F> {
    /// Wrapped closure.
    func: F,
}

impl<F> FnOperation<F>
where
    F: Fn(GateParams) -> Result<Value, OperationError> + Send + Sync,
{
    /// Wraps a closure.
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self {
            func,
        }
    }
}

#[async_trait]
impl<F> GateOperation for FnOperation<F>
where
    F: Fn(GateParams) -> Result<Value, OperationError> + Send + Sync,
{
    async fn invoke(&self, params: GateParams) -> Result<Value, OperationError> {
        (self.func)(params)
    }
}

// ============================================================================
// SECTION: Policy Source
// ============================================================================

/// Policy source errors.
#[derive(Debug, Error)]
pub enum PolicySourceError {
    /// Source could not be read.
    #[error("policy source io error: {0}")]
    Io(String),
    /// Source content could not be decoded into a document.
    #[error("policy source parse error: {0}")]
    Parse(String),
    /// Source content violated a source-level limit.
    #[error("policy source rejected: {0}")]
    Invalid(String),
}

/// Provider of raw policy documents (the config-store collaborator).
pub trait PolicySource: Send + Sync {
    /// Fetches the current policy document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicySourceError`] when the document cannot be produced.
    fn fetch(&self) -> Result<Value, PolicySourceError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Audit sink for gate decisions and policy imports.
pub trait GateAuditSink: Send + Sync {
    /// Record a gate decision event.
    fn record(&self, event: &GateAuditEvent);

    /// Record a policy import event.
    fn record_policy(&self, _event: &PolicyAuditEvent) {}
}
