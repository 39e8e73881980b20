// crates/authz-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared helpers for policy, engine, and gate tests.
// Purpose: Build stores, users, and params with minimal boilerplate.
// Dependencies: authz-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Shared fixtures for authz-gate-core integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use authz_gate_core::CommandName;
use authz_gate_core::GateOperation;
use authz_gate_core::GateParams;
use authz_gate_core::ModuleName;
use authz_gate_core::NoopAuditSink;
use authz_gate_core::OperationError;
use authz_gate_core::PolicyEngine;
use authz_gate_core::PolicyStore;
use authz_gate_core::ServiceName;
use authz_gate_core::User;
use serde_json::Map;
use serde_json::Value;

/// Builds a store that records no audit events.
pub fn quiet_store() -> PolicyStore {
    PolicyStore::with_audit(Arc::new(NoopAuditSink))
}

/// Builds a store holding `document`, panicking on validation failure.
pub fn store_with(document: &Value) -> PolicyStore {
    let store = quiet_store();
    store.import(document).expect("fixture policy must be valid");
    store
}

/// Builds an engine over `document`.
pub fn engine_with(document: &Value) -> PolicyEngine {
    PolicyEngine::new(store_with(document))
}

/// Asks `engine` for a decision with string names.
pub fn decide(
    engine: &PolicyEngine,
    service: &str,
    module: &str,
    command: &str,
    user: &User,
    consumer: &str,
) -> bool {
    engine.decide(
        &ServiceName::new(service),
        &ModuleName::new(module),
        &CommandName::new(command),
        user,
        consumer,
    )
}

/// Builds an authenticated user with the given roles.
pub fn user(id: u64, roles: &[&str]) -> User {
    User::new(id, format!("user-{id}"), roles.iter().copied())
}

/// Converts a JSON object literal into a params map.
pub fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("params fixture must be an object, got {other}"),
    }
}

/// Operation that counts invocations and echoes a fixed value.
#[derive(Clone, Default)]
pub struct SpyOperation {
    /// Invocation counter shared with the test.
    pub calls: Arc<AtomicUsize>,
    /// Last params the operation saw.
    pub last: Arc<std::sync::Mutex<Option<GateParams>>>,
    /// Failure message to return instead of a value.
    pub fail_with: Option<String>,
}

impl SpyOperation {
    /// Returns the number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns a spy that always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl GateOperation for SpyOperation {
    async fn invoke(&self, params: GateParams) -> Result<Value, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(params);
        match &self.fail_with {
            Some(message) => Err(OperationError::new(message.clone())),
            None => Ok(Value::String("op-result".to_string())),
        }
    }
}
