// crates/authz-gate-config/src/lib.rs
// ============================================================================
// Module: Authz Gate Config Library
// Description: Canonical config model, validation, and policy document loading.
// Purpose: Single source of truth for authz-gate.toml semantics.
// Dependencies: authz-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `authz-gate-config` defines the configuration model for hosts embedding the
//! authorization gate. It provides strict, fail-closed validation, builds the
//! core [`authz_gate_core::GateSettings`] and audit sink, and loads policy
//! documents from disk.
//!
//! Security posture: config and policy files are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod policy_document;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use policy_document::*;
