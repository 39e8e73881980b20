// crates/authz-gate-core/src/core/audit.rs
// ============================================================================
// Module: Authz Gate Audit Events
// Description: Structured audit payloads for gate decisions and policy imports.
// Purpose: Record who attempted what, and why it was allowed or denied.
// Dependencies: crate::core::{decision, hashing, policy}, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events follow the `(message, attachment?, tags?)` log-line contract:
//! a human-readable message, a flat rendering of the call params, and a small
//! tag list, plus structured fields for machine consumers. Events are emitted
//! through [`crate::interfaces::GateAuditSink`] implementations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::decision::DecisionReason;
use crate::core::hashing::PolicyDigest;
use crate::core::policy::PolicyViolation;

// ============================================================================
// SECTION: Gate Outcomes
// ============================================================================

/// Point in the gate flow at which an event was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Params lacked the routing marker.
    RejectNoPattern,
    /// Policy denied the call.
    Unauthorized,
    /// Policy allowed the call; the operation is about to run.
    Invoking,
    /// The operation ran and failed.
    Exception,
}

impl GateOutcome {
    /// Returns the stable snake-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RejectNoPattern => "reject_no_pattern",
            Self::Unauthorized => "unauthorized",
            Self::Invoking => "invoking",
            Self::Exception => "exception",
        }
    }
}

// ============================================================================
// SECTION: Gate Audit Event
// ============================================================================

/// Gate decision audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Service the gate protects.
    pub service: String,
    /// Module of the guarded operation.
    pub module: String,
    /// Command of the guarded operation.
    pub command: String,
    /// Point in the gate flow.
    pub outcome: GateOutcome,
    /// Policy decision reason when a decision was made.
    pub reason: Option<DecisionReason>,
    /// Normalized user id (`0` when anonymous or not yet normalized).
    pub user_id: u64,
    /// Declared consumer service.
    pub consumer: String,
    /// Policy revision that produced the decision.
    pub policy_revision: Option<u64>,
    /// Human-readable log message.
    pub message: String,
    /// Flat params rendering.
    pub attachment: String,
    /// Operation error message for exceptions.
    pub error: Option<String>,
    /// Log tags.
    pub tags: Vec<String>,
}

/// Inputs required to construct a gate audit event.
pub struct GateAuditEventParams {
    /// Service the gate protects.
    pub service: String,
    /// Module of the guarded operation.
    pub module: String,
    /// Command of the guarded operation.
    pub command: String,
    /// Point in the gate flow.
    pub outcome: GateOutcome,
    /// Policy decision reason when a decision was made.
    pub reason: Option<DecisionReason>,
    /// Normalized user id.
    pub user_id: u64,
    /// Declared consumer service.
    pub consumer: String,
    /// Policy revision that produced the decision.
    pub policy_revision: Option<u64>,
    /// Call params (decorated when identity was normalized).
    pub params: Map<String, Value>,
    /// Operation error message for exceptions.
    pub error: Option<String>,
}

impl GateAuditEvent {
    /// Creates a gate audit event, rendering the message and attachment.
    #[must_use]
    pub fn new(params: GateAuditEventParams) -> Self {
        let depth = if params.outcome == GateOutcome::Invoking { 1 } else { 0 };
        let attachment = serialize_params(&params.params, depth);
        let command = &params.command;
        let message = match (params.outcome, params.error.as_deref()) {
            (GateOutcome::RejectNoPattern, _) => {
                format!("#{command} - Reject - No module pattern found - {attachment}")
            }
            (GateOutcome::Unauthorized, _) => format!("#{command} - Unauthorized - {attachment}"),
            (GateOutcome::Invoking, _) => format!("#{command} - Invoking: {attachment}"),
            (GateOutcome::Exception, error) => {
                format!("#{command} - Exception - {} - {attachment}", error.unwrap_or_default())
            }
        };
        let mut tags = vec!["authz".to_string(), params.outcome.label().to_string()];
        if params.outcome == GateOutcome::Exception {
            tags.push("error".to_string());
        }
        Self {
            event: "gate_decision",
            timestamp_ms: now_ms(),
            service: params.service,
            module: params.module,
            command: params.command,
            outcome: params.outcome,
            reason: params.reason,
            user_id: params.user_id,
            consumer: params.consumer,
            policy_revision: params.policy_revision,
            message,
            attachment,
            error: params.error,
            tags,
        }
    }
}

// ============================================================================
// SECTION: Policy Audit Event
// ============================================================================

/// Policy import audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Whether the new tree went live.
    pub accepted: bool,
    /// Revision that is live after the attempt.
    pub revision: u64,
    /// Digest of the live tree after the attempt.
    pub digest: Option<PolicyDigest>,
    /// Human-readable log message.
    pub message: String,
    /// Violations that caused a rejection.
    pub violations: Vec<PolicyViolation>,
    /// Log tags.
    pub tags: Vec<String>,
}

impl PolicyAuditEvent {
    /// Creates an event for an accepted import.
    #[must_use]
    pub fn accepted(revision: u64, digest: Option<PolicyDigest>) -> Self {
        Self {
            event: "policy_import",
            timestamp_ms: now_ms(),
            accepted: true,
            revision,
            digest,
            message: format!("Import authorization succeeded (revision {revision})"),
            violations: Vec::new(),
            tags: vec!["authz".to_string(), "policy".to_string()],
        }
    }

    /// Creates an event for a rejected import; `revision` is the one still live.
    #[must_use]
    pub fn rejected(
        revision: u64,
        digest: Option<PolicyDigest>,
        violations: Vec<PolicyViolation>,
    ) -> Self {
        Self {
            event: "policy_import",
            timestamp_ms: now_ms(),
            accepted: false,
            revision,
            digest,
            message: "Import authorization failed".to_string(),
            violations,
            tags: vec!["authz".to_string(), "policy".to_string(), "error".to_string()],
        }
    }

    /// Creates an event for a policy source that could not be fetched.
    #[must_use]
    pub fn fetch_failed(revision: u64, digest: Option<PolicyDigest>, error: &str) -> Self {
        Self {
            event: "policy_import",
            timestamp_ms: now_ms(),
            accepted: false,
            revision,
            digest,
            message: format!("Import authorization failed - {error}"),
            violations: Vec::new(),
            tags: vec!["authz".to_string(), "policy".to_string(), "error".to_string()],
        }
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Params Rendering
// ============================================================================

/// Renders params as flat `key=value` pairs joined by `,`.
///
/// Keys ending in `$` are transport metadata and are skipped. At `depth == 0`
/// nested objects expand one level as `key={...}`; at any deeper depth they
/// are omitted. Strings render raw; other values render as JSON.
#[must_use]
pub fn serialize_params(params: &Map<String, Value>, depth: usize) -> String {
    let mut parts = Vec::with_capacity(params.len());
    for (key, value) in params {
        if key.ends_with('$') {
            continue;
        }
        match value {
            Value::Object(nested) => {
                if depth == 0 {
                    parts.push(format!("{key}={{{}}}", serialize_params(nested, depth + 1)));
                }
            }
            Value::String(text) => parts.push(format!("{key}={text}")),
            other => parts.push(format!("{key}={other}")),
        }
    }
    parts.join(",")
}
