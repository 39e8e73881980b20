// crates/authz-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Authz Gate Policy Store
// Description: Shared, atomically swapped policy tree with revisions.
// Purpose: Serve consistent snapshots to concurrent readers across imports.
// Dependencies: crate::{core, interfaces, runtime::audit}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`PolicyStore`] owns the live policy tree behind a read-write lock holding
//! an `Arc<PolicySnapshot>`. Readers clone the `Arc` and evaluate against an
//! immutable tree; imports validate off-lock and then swap the `Arc` under the
//! write lock, so readers observe either the fully-old or fully-new tree.
//!
//! A rejected import keeps serving the previous tree. The rejection is
//! recorded through the audit sink and returned to the importer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::audit::PolicyAuditEvent;
use crate::core::hashing::PolicyDigest;
use crate::core::hashing::policy_digest;
use crate::core::policy::PolicyTree;
use crate::core::policy::ValidationError;
use crate::interfaces::GateAuditSink;
use crate::interfaces::PolicySource;
use crate::interfaces::PolicySourceError;
use crate::runtime::audit::StderrAuditSink;

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable view of the policy tree at one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySnapshot {
    /// Revision counter; `0` is the bootstrap tree.
    pub revision: u64,
    /// Digest of the canonical tree document.
    pub digest: Option<PolicyDigest>,
    /// The policy tree.
    pub tree: PolicyTree,
}

impl PolicySnapshot {
    /// Builds a snapshot, hashing the tree.
    fn new(revision: u64, tree: PolicyTree) -> Self {
        Self {
            revision,
            digest: policy_digest(&tree).ok(),
            tree,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures refreshing the store from a [`PolicySource`].
#[derive(Debug, Error)]
pub enum PolicyRefreshError {
    /// The source could not produce a document.
    #[error(transparent)]
    Source(#[from] PolicySourceError),
    /// The document failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Shared policy store handle; clones refer to the same live tree.
#[derive(Clone)]
pub struct PolicyStore {
    /// Live snapshot, swapped whole on import.
    live: Arc<RwLock<Arc<PolicySnapshot>>>,
    /// Audit sink for import events.
    audit: Arc<dyn GateAuditSink>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore {
    /// Creates a store serving the bootstrap tree, logging imports to stderr.
    ///
    /// Use [`PolicyStore::with_audit`] with a
    /// [`NoopAuditSink`](crate::NoopAuditSink) to silence it.
    #[must_use]
    pub fn new() -> Self {
        Self::with_audit(Arc::new(StderrAuditSink))
    }

    /// Creates a store serving the bootstrap tree, logging imports to `audit`.
    #[must_use]
    pub fn with_audit(audit: Arc<dyn GateAuditSink>) -> Self {
        Self {
            live: Arc::new(RwLock::new(Arc::new(PolicySnapshot::new(
                0,
                PolicyTree::bootstrap(),
            )))),
            audit,
        }
    }

    /// Returns the live snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        Arc::clone(&self.live.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the live tree.
    #[must_use]
    pub fn export(&self) -> PolicyTree {
        self.snapshot().tree.clone()
    }

    /// Returns the live tree in document form.
    #[must_use]
    pub fn export_document(&self) -> Value {
        self.snapshot().tree.to_document()
    }

    /// Replaces the live tree with the permissive bootstrap tree.
    pub fn bootstrap(&self) -> u64 {
        self.import_tree(PolicyTree::bootstrap())
    }

    /// Validates and installs a raw policy document.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the document is malformed; the live
    /// tree is left unchanged.
    pub fn import(&self, document: &Value) -> Result<u64, ValidationError> {
        match PolicyTree::from_document(document) {
            Ok(tree) => Ok(self.import_tree(tree)),
            Err(err) => {
                let current = self.snapshot();
                self.audit.record_policy(&PolicyAuditEvent::rejected(
                    current.revision,
                    current.digest.clone(),
                    err.violations.clone(),
                ));
                Err(err)
            }
        }
    }

    /// Installs an already-validated tree, returning its revision.
    pub fn import_tree(&self, tree: PolicyTree) -> u64 {
        let digest = policy_digest(&tree).ok();
        let installed = {
            let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
            let next = Arc::new(PolicySnapshot {
                revision: live.revision.saturating_add(1),
                digest,
                tree,
            });
            *live = Arc::clone(&next);
            next
        };
        let event = PolicyAuditEvent::accepted(installed.revision, installed.digest.clone());
        self.audit.record_policy(&event);
        installed.revision
    }

    /// Fetches a document from `source` and imports it.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyRefreshError`] when fetching or validation fails; the
    /// live tree is left unchanged.
    pub fn refresh_from(&self, source: &dyn PolicySource) -> Result<u64, PolicyRefreshError> {
        let document = match source.fetch() {
            Ok(document) => document,
            Err(err) => {
                let current = self.snapshot();
                self.audit.record_policy(&PolicyAuditEvent::fetch_failed(
                    current.revision,
                    current.digest.clone(),
                    &err.to_string(),
                ));
                return Err(err.into());
            }
        };
        Ok(self.import(&document)?)
    }
}
