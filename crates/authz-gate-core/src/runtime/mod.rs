// crates/authz-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Authz Gate Runtime
// Description: Policy store, decision engine, authorization gate, audit sinks.
// Purpose: Wire core types into a concurrent, request-scoped gate.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime holds the only shared mutable state in the crate, the live
//! policy snapshot inside [`PolicyStore`]. Everything else is per call.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod engine;
pub mod gate;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use engine::PolicyEngine;
pub use engine::evaluate_tree;
pub use gate::AuthorizationGate;
pub use gate::DEFAULT_ROUTING_MARKER;
pub use gate::DEFAULT_SERVICE_NAME;
pub use gate::GateSettings;
pub use gate::Gatekeeper;
pub use gate::RegistrationError;
pub use store::PolicyRefreshError;
pub use store::PolicySnapshot;
pub use store::PolicyStore;
