// crates/authz-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Authz Gate Policy Engine
// Description: Pure decision function over the live policy tree.
// Purpose: Resolve (service, module, command) to a rule and evaluate it.
// Dependencies: crate::{core, runtime::store}
// ============================================================================

//! ## Overview
//! Resolution is deterministic and never backtracks: at each level the exact
//! key wins over `*`, and once an exact entry is chosen its verdict stands even
//! if the wildcard would have been more permissive. A missing level denies.
//!
//! The engine reads one snapshot per decision, so a concurrent import never
//! splits a decision across two trees.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::decision::DecisionContext;
use crate::core::decision::PolicyDecision;
use crate::core::identifiers::CommandName;
use crate::core::identifiers::ModuleName;
use crate::core::identifiers::ServiceName;
use crate::core::identity::User;
use crate::core::policy::PolicyTree;
use crate::runtime::store::PolicyStore;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Policy decision engine bound to a store.
#[derive(Clone)]
pub struct PolicyEngine {
    /// Store providing the live tree.
    store: PolicyStore,
}

impl PolicyEngine {
    /// Creates an engine reading from `store`.
    #[must_use]
    pub const fn new(store: PolicyStore) -> Self {
        Self {
            store,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// Evaluates a decision against the live tree.
    #[must_use]
    pub fn evaluate(&self, context: &DecisionContext<'_>) -> PolicyDecision {
        let snapshot = self.store.snapshot();
        evaluate_tree(&snapshot.tree, snapshot.revision, context)
    }

    /// Returns whether the call may proceed.
    #[must_use]
    pub fn decide(
        &self,
        service: &ServiceName,
        module: &ModuleName,
        command: &CommandName,
        user: &User,
        consumer: &str,
    ) -> bool {
        self.evaluate(&DecisionContext {
            service,
            module,
            command,
            user,
            consumer,
        })
        .allowed
    }
}

/// Evaluates a decision against a specific tree.
#[must_use]
pub fn evaluate_tree(
    tree: &PolicyTree,
    revision: u64,
    context: &DecisionContext<'_>,
) -> PolicyDecision {
    let reason = match tree.resolve(context.service, context.module, context.command) {
        Ok(rule) => rule.evaluate(context.user, context.consumer),
        Err(reason) => reason,
    };
    PolicyDecision::from_reason(reason, revision)
}
