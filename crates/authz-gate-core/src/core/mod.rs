// crates/authz-gate-core/src/core/mod.rs
// ============================================================================
// Module: Authz Gate Core Types
// Description: Policy grammar, identity, decision, and envelope types.
// Purpose: Provide stable, serializable types shared by the runtime and hosts.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are pure data plus pure functions: parsing a policy document,
//! resolving a rule, normalizing a caller, rendering an audit line. Nothing in
//! this module holds shared state.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod decision;
pub mod envelope;
pub mod hashing;
pub mod identifiers;
pub mod identity;
pub mod policy;
pub mod rule;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::GateAuditEvent;
pub use audit::GateAuditEventParams;
pub use audit::GateOutcome;
pub use audit::PolicyAuditEvent;
pub use audit::serialize_params;
pub use decision::DecisionContext;
pub use decision::DecisionReason;
pub use decision::PolicyDecision;
pub use envelope::GateError;
pub use envelope::OperationError;
pub use envelope::ResultEnvelope;
pub use hashing::DigestAlgorithm;
pub use hashing::HashError;
pub use hashing::PolicyDigest;
pub use hashing::canonical_json_bytes;
pub use hashing::policy_digest;
pub use identifiers::CommandName;
pub use identifiers::ModuleName;
pub use identifiers::ServiceName;
pub use identifiers::WILDCARD;
pub use identity::AUTHENTICATED_FIELD;
pub use identity::CONSUMER_FIELD;
pub use identity::CallerIdentity;
pub use identity::GateParams;
pub use identity::IdentityNormalizer;
pub use identity::USER_FIELD;
pub use identity::User;
pub use policy::ModulePolicy;
pub use policy::PolicyTree;
pub use policy::PolicyViolation;
pub use policy::ServicePolicy;
pub use policy::ValidationError;
pub use policy::ViolationKind;
pub use rule::AUTHENTICATED_TOKEN;
pub use rule::RoleSet;
pub use rule::Rule;
pub use rule::TrustDescriptor;
