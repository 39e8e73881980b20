// crates/authz-gate-core/src/core/decision.rs
// ============================================================================
// Module: Authz Gate Decisions
// Description: Decision context, verdicts, and reason labels.
// Purpose: Carry one authorization question and its auditable answer.
// Dependencies: crate::core::{identifiers, identity}, serde
// ============================================================================

//! ## Overview
//! A [`DecisionContext`] is built per call and consumed once by the policy
//! engine. The resulting [`PolicyDecision`] pairs the yes/no verdict with a
//! [`DecisionReason`] so audit lines can explain why a call was let through or
//! turned away.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CommandName;
use crate::core::identifiers::ModuleName;
use crate::core::identifiers::ServiceName;
use crate::core::identity::User;

// ============================================================================
// SECTION: Decision Context
// ============================================================================

/// Inputs for a single authorization decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Service handling the call.
    pub service: &'a ServiceName,
    /// Module the command belongs to.
    pub module: &'a ModuleName,
    /// Command being invoked.
    pub command: &'a CommandName,
    /// Normalized caller.
    pub user: &'a User,
    /// Self-declared consumer service name (may be empty).
    pub consumer: &'a str,
}

// ============================================================================
// SECTION: Decision Reasons
// ============================================================================

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Neither the service nor the wildcard service has an entry.
    ServiceNotFound,
    /// Neither the module nor the wildcard module has an entry.
    ModuleNotFound,
    /// Neither the command nor the wildcard command has an entry.
    CommandNotFound,
    /// Resolved rule permits unconditionally.
    AllowAll,
    /// Resolved rule denies unconditionally.
    DenyAll,
    /// Caller is authenticated.
    Authenticated,
    /// Rule requires an authenticated caller.
    NotAuthenticated,
    /// Caller holds a required role.
    RoleMatched,
    /// Caller holds none of the required roles.
    RoleMissing,
    /// Consumer service is trusted.
    TrustedService,
    /// Consumer service is not listed.
    UntrustedService,
    /// Trust descriptor carries an `auth` flag that is not `true`.
    TrustDisabled,
}

impl DecisionReason {
    /// Returns true when this reason grants access.
    #[must_use]
    pub const fn allows(self) -> bool {
        matches!(
            self,
            Self::AllowAll | Self::Authenticated | Self::RoleMatched | Self::TrustedService
        )
    }

    /// Returns the stable snake-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ServiceNotFound => "service_not_found",
            Self::ModuleNotFound => "module_not_found",
            Self::CommandNotFound => "command_not_found",
            Self::AllowAll => "allow_all",
            Self::DenyAll => "deny_all",
            Self::Authenticated => "authenticated",
            Self::NotAuthenticated => "not_authenticated",
            Self::RoleMatched => "role_matched",
            Self::RoleMissing => "role_missing",
            Self::TrustedService => "trusted_service",
            Self::UntrustedService => "untrusted_service",
            Self::TrustDisabled => "trust_disabled",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Policy Decision
// ============================================================================

/// Authoritative decision for a call.
///
/// # Invariants
/// - `allowed == reason.allows()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the call may proceed.
    pub allowed: bool,
    /// Reason label for audit logs.
    pub reason: DecisionReason,
    /// Revision of the policy tree that produced the decision.
    pub revision: u64,
}

impl PolicyDecision {
    /// Builds a decision from a reason and the policy revision it came from.
    #[must_use]
    pub const fn from_reason(reason: DecisionReason, revision: u64) -> Self {
        Self {
            allowed: reason.allows(),
            reason,
            revision,
        }
    }
}
