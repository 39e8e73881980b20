// crates/authz-gate-core/src/lib.rs
// ============================================================================
// Module: Authz Gate Core Library
// Description: Public API surface for the Authz Gate core.
// Purpose: Expose policy types, collaborator interfaces, and the gate runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Authz Gate is an embedded authorization decision engine. Given a caller's
//! identity and a requested `(service, module, command)` triple it decides
//! whether the call may proceed, and an [`AuthorizationGate`] enforces that
//! decision around an arbitrary operation, returning a uniform
//! [`ResultEnvelope`].
//!
//! Authentication, policy persistence, and transport dispatch live outside
//! this crate and integrate through [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::FnOperation;
pub use interfaces::GateAuditSink;
pub use interfaces::GateOperation;
pub use interfaces::PolicySource;
pub use interfaces::PolicySourceError;
pub use runtime::AuthorizationGate;
pub use runtime::DEFAULT_ROUTING_MARKER;
pub use runtime::DEFAULT_SERVICE_NAME;
pub use runtime::FileAuditSink;
pub use runtime::GateSettings;
pub use runtime::Gatekeeper;
pub use runtime::MemoryAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::PolicyEngine;
pub use runtime::PolicyRefreshError;
pub use runtime::PolicySnapshot;
pub use runtime::PolicyStore;
pub use runtime::RegistrationError;
pub use runtime::StderrAuditSink;
pub use runtime::evaluate_tree;
