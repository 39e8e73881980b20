// crates/authz-gate-core/src/core/rule.rs
// ============================================================================
// Module: Authz Gate Rules
// Description: Typed access rules and their evaluation against a caller.
// Purpose: Replace shape-checked policy values with an explicit tagged union.
// Dependencies: crate::core::{decision, identity}, serde
// ============================================================================

//! ## Overview
//! A [`Rule`] is the leaf of the policy tree. Each policy document value maps
//! to exactly one variant:
//!
//! | Document value | Variant |
//! |----------------|---------|
//! | `true` | [`Rule::AllowAll`] |
//! | `false` | [`Rule::DenyAll`] |
//! | `"auth"` | [`Rule::RequireAuthenticated`] |
//! | `["admin", ...]` | [`Rule::RequireAnyRole`] |
//! | `{ "services": [...], "roles"?: [...], "auth"?: true }` | [`Rule::TrustedService`] |
//!
//! Evaluation never fails; it yields a [`DecisionReason`] whose
//! [`DecisionReason::allows`] is the verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::Serializer;

use crate::core::decision::DecisionReason;
use crate::core::identity::User;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Document token for the "authenticated callers only" rule.
pub const AUTHENTICATED_TOKEN: &str = "auth";

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Access rule attached to a module or command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Permit unconditionally.
    AllowAll,
    /// Deny unconditionally.
    DenyAll,
    /// Permit iff the caller is authenticated (`id > 0`).
    RequireAuthenticated,
    /// Permit iff the caller is authenticated and holds any listed role.
    RequireAnyRole(RoleSet),
    /// Permit iff the declared consumer service is trusted by the descriptor.
    TrustedService(TrustDescriptor),
}

impl Rule {
    /// Builds a role rule from role names.
    #[must_use]
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RequireAnyRole(RoleSet::new(roles))
    }

    /// Evaluates the rule for a normalized caller.
    #[must_use]
    pub fn evaluate(&self, user: &User, consumer: &str) -> DecisionReason {
        match self {
            Self::AllowAll => DecisionReason::AllowAll,
            Self::DenyAll => DecisionReason::DenyAll,
            Self::RequireAuthenticated => {
                if user.is_authenticated() {
                    DecisionReason::Authenticated
                } else {
                    DecisionReason::NotAuthenticated
                }
            }
            Self::RequireAnyRole(roles) => {
                if !user.is_authenticated() {
                    DecisionReason::NotAuthenticated
                } else if roles.matches_any(user.roles()) {
                    DecisionReason::RoleMatched
                } else {
                    DecisionReason::RoleMissing
                }
            }
            Self::TrustedService(descriptor) => descriptor.evaluate(user, consumer),
        }
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::AllowAll => serializer.serialize_bool(true),
            Self::DenyAll => serializer.serialize_bool(false),
            Self::RequireAuthenticated => serializer.serialize_str(AUTHENTICATED_TOKEN),
            Self::RequireAnyRole(roles) => roles.serialize(serializer),
            Self::TrustedService(descriptor) => descriptor.serialize(serializer),
        }
    }
}

// ============================================================================
// SECTION: Role Set
// ============================================================================

/// Ordered role names matched case-insensitively (ASCII).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    /// Creates a role set preserving declaration order.
    #[must_use]
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    /// Returns the declared role names.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns true when any of `held` equals a declared role, ignoring ASCII case.
    #[must_use]
    pub fn matches_any(&self, held: &[String]) -> bool {
        held.iter().any(|role| self.0.iter().any(|expected| expected.eq_ignore_ascii_case(role)))
    }
}

// ============================================================================
// SECTION: Trust Descriptor
// ============================================================================

/// Service-trust rule body.
///
/// # Invariants
/// - `auth`, when present, must be `Some(true)` for the descriptor to grant.
///   `auth: true` does not itself require an authenticated user.
/// - `roles`, when present, require an authenticated caller whose roles
///   intersect them, as a plain role-list rule does.
/// - The consumer must be listed in `services`; an empty consumer never is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustDescriptor {
    /// Consumer service names allowed to call.
    pub services: Vec<String>,
    /// Optional roles the caller must also hold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<RoleSet>,
    /// Optional auth flag; any value other than `true` disables the descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<bool>,
}

impl TrustDescriptor {
    /// Creates a descriptor trusting the given consumer services.
    #[must_use]
    pub fn new<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            services: services.into_iter().map(Into::into).collect(),
            roles: None,
            auth: None,
        }
    }

    /// Returns a copy that additionally requires one of `roles`.
    #[must_use]
    pub fn with_roles(mut self, roles: RoleSet) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Returns a copy with the auth flag set.
    #[must_use]
    pub const fn with_auth(mut self, auth: bool) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Evaluates the descriptor for a caller and declared consumer.
    #[must_use]
    pub fn evaluate(&self, user: &User, consumer: &str) -> DecisionReason {
        if matches!(self.auth, Some(false)) {
            return DecisionReason::TrustDisabled;
        }
        if let Some(roles) = &self.roles {
            if !user.is_authenticated() {
                return DecisionReason::NotAuthenticated;
            }
            if !roles.matches_any(user.roles()) {
                return DecisionReason::RoleMissing;
            }
        }
        if consumer.is_empty() || !self.services.iter().any(|service| service == consumer) {
            return DecisionReason::UntrustedService;
        }
        DecisionReason::TrustedService
    }
}
