// crates/authz-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Authz Gate Audit Sinks
// Description: JSON-lines audit sinks for stderr, files, and memory.
// Purpose: Route gate and policy audit events without a logging framework.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Sinks serialize each event as one JSON object per line. Write failures are
//! swallowed: audit logging must never change an authorization outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Serialize;

use crate::core::audit::GateAuditEvent;
use crate::core::audit::PolicyAuditEvent;
use crate::interfaces::GateAuditSink;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl GateAuditSink for StderrAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        write_stderr(event);
    }

    fn record_policy(&self, event: &PolicyAuditEvent) {
        write_stderr(event);
    }
}

/// Writes one JSON line to stderr.
fn write_stderr<T: Serialize>(event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(io::stderr(), "{payload}");
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one JSON line and flushes.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl GateAuditSink for FileAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        self.append(event);
    }

    fn record_policy(&self, event: &PolicyAuditEvent) {
        self.append(event);
    }
}

// ============================================================================
// SECTION: No-op Sink
// ============================================================================

/// No-op audit sink.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}

// ============================================================================
// SECTION: Memory Sink
// ============================================================================

/// Audit sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded gate events, oldest first.
    gate_events: Mutex<Vec<GateAuditEvent>>,
    /// Recorded policy events, oldest first.
    policy_events: Mutex<Vec<PolicyAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded gate events.
    #[must_use]
    pub fn gate_events(&self) -> Vec<GateAuditEvent> {
        self.gate_events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns a copy of the recorded policy events.
    #[must_use]
    pub fn policy_events(&self) -> Vec<PolicyAuditEvent> {
        self.policy_events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl GateAuditSink for MemoryAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        self.gate_events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
    }

    fn record_policy(&self, event: &PolicyAuditEvent) {
        self.policy_events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
    }
}
