// crates/authz-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Authz Gate Authorization Gate
// Description: Wraps guarded operations with routing, identity, and policy checks.
// Purpose: Invoke an operation only after the policy engine allowed the call.
// Dependencies: crate::{core, interfaces, runtime::engine}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Gatekeeper`] carries the shared engine, settings, and audit sink. Each
//! guarded command is registered once through [`Gatekeeper::guard`], which
//! checks module and command names up front and returns an
//! [`AuthorizationGate`]. Per call the gate:
//!
//! 1. rejects params without the routing marker field,
//! 2. normalizes and injects caller identity,
//! 3. asks the engine for a decision and rejects on deny,
//! 4. invokes the operation and wraps the outcome in a [`ResultEnvelope`].
//!
//! Every step that reaches a verdict records a [`GateAuditEvent`].
//!
//! Security posture: params are untrusted; on deny the operation is never
//! invoked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::audit::GateAuditEvent;
use crate::core::audit::GateAuditEventParams;
use crate::core::audit::GateOutcome;
use crate::core::decision::DecisionContext;
use crate::core::decision::PolicyDecision;
use crate::core::envelope::GateError;
use crate::core::envelope::ResultEnvelope;
use crate::core::identifiers::CommandName;
use crate::core::identifiers::ModuleName;
use crate::core::identifiers::ServiceName;
use crate::core::identity::CallerIdentity;
use crate::core::identity::GateParams;
use crate::interfaces::GateAuditSink;
use crate::interfaces::GateOperation;
use crate::runtime::engine::PolicyEngine;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "_";
/// Params field that marks a call as routed through normal dispatch.
pub const DEFAULT_ROUTING_MARKER: &str = "module";

/// Gate settings shared by every guarded operation of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    /// Service this process serves; the first policy tree level.
    pub service_name: ServiceName,
    /// Params field that must be present on every call.
    pub routing_marker: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            service_name: ServiceName::new(DEFAULT_SERVICE_NAME),
            routing_marker: DEFAULT_ROUTING_MARKER.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Programmer errors caught when registering a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Module name was empty.
    #[error("guarded operation requires a non-empty module name")]
    EmptyModule,
    /// Command name was empty.
    #[error("guarded operation requires a non-empty command name")]
    EmptyCommand,
}

// ============================================================================
// SECTION: Gatekeeper
// ============================================================================

/// Factory for authorization gates sharing one engine and audit sink.
#[derive(Clone)]
pub struct Gatekeeper {
    /// Decision engine.
    engine: PolicyEngine,
    /// Shared settings.
    settings: Arc<GateSettings>,
    /// Decision audit sink.
    audit: Arc<dyn GateAuditSink>,
}

impl Gatekeeper {
    /// Creates a gatekeeper.
    #[must_use]
    pub fn new(
        engine: PolicyEngine,
        settings: GateSettings,
        audit: Arc<dyn GateAuditSink>,
    ) -> Self {
        Self {
            engine,
            settings: Arc::new(settings),
            audit,
        }
    }

    /// Returns the decision engine.
    #[must_use]
    pub const fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Returns the gate settings.
    #[must_use]
    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// Wraps `operation` as the handler for `(module, command)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the module or command name is empty.
    pub fn guard<O: GateOperation>(
        &self,
        module: impl Into<ModuleName>,
        command: impl Into<CommandName>,
        operation: O,
    ) -> Result<AuthorizationGate<O>, RegistrationError> {
        let module = module.into();
        let command = command.into();
        if module.as_str().is_empty() {
            return Err(RegistrationError::EmptyModule);
        }
        if command.as_str().is_empty() {
            return Err(RegistrationError::EmptyCommand);
        }
        Ok(AuthorizationGate {
            keeper: self.clone(),
            module,
            command,
            operation,
        })
    }
}

// ============================================================================
// SECTION: Authorization Gate
// ============================================================================

/// A guarded operation bound to its `(module, command)` pattern.
pub struct AuthorizationGate<O> {
    /// Shared engine, settings, and audit sink.
    keeper: Gatekeeper,
    /// Module name.
    module: ModuleName,
    /// Command name.
    command: CommandName,
    /// Wrapped operation.
    operation: O,
}

impl<O: GateOperation> AuthorizationGate<O> {
    /// Returns the module name.
    #[must_use]
    pub const fn module(&self) -> &ModuleName {
        &self.module
    }

    /// Returns the command name.
    #[must_use]
    pub const fn command(&self) -> &CommandName {
        &self.command
    }

    /// Runs the routing, identity, and policy checks without invoking.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NoModulePattern`] or [`GateError::Unauthorized`].
    pub fn authorize(
        &self,
        params: Map<String, Value>,
    ) -> Result<(GateParams, PolicyDecision), GateError> {
        if !params.contains_key(&self.keeper.settings.routing_marker) {
            self.record(GateOutcome::RejectNoPattern, None, None, params, None);
            return Err(GateError::NoModulePattern);
        }
        let decorated = GateParams::decorate(params);
        let decision = self.keeper.engine.evaluate(&DecisionContext {
            service: &self.keeper.settings.service_name,
            module: &self.module,
            command: &self.command,
            user: decorated.user(),
            consumer: decorated.consumer(),
        });
        if !decision.allowed {
            let identity = decorated.identity().clone();
            self.record(
                GateOutcome::Unauthorized,
                Some(&decision),
                Some(&identity),
                decorated.into_payload(),
                None,
            );
            return Err(GateError::Unauthorized);
        }
        self.record(
            GateOutcome::Invoking,
            Some(&decision),
            Some(decorated.identity()),
            decorated.payload().clone(),
            None,
        );
        Ok((decorated, decision))
    }

    /// Authorizes and, when allowed, invokes the operation.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] on rejection or operation failure.
    pub async fn call(&self, params: Map<String, Value>) -> Result<Value, GateError> {
        let (decorated, decision) = self.authorize(params)?;
        let identity = decorated.identity().clone();
        let payload = decorated.payload().clone();
        match self.operation.invoke(decorated).await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.record(
                    GateOutcome::Exception,
                    Some(&decision),
                    Some(&identity),
                    payload,
                    Some(err.to_string()),
                );
                Err(GateError::Operation(err))
            }
        }
    }

    /// Authorizes, invokes, and wraps the outcome in a result envelope.
    pub async fn handle(&self, params: Map<String, Value>) -> ResultEnvelope {
        ResultEnvelope::from(self.call(params).await)
    }

    /// Records a gate audit event.
    fn record(
        &self,
        outcome: GateOutcome,
        decision: Option<&PolicyDecision>,
        identity: Option<&CallerIdentity>,
        params: Map<String, Value>,
        error: Option<String>,
    ) {
        let event = GateAuditEvent::new(GateAuditEventParams {
            service: self.keeper.settings.service_name.to_string(),
            module: self.module.to_string(),
            command: self.command.to_string(),
            outcome,
            reason: decision.map(|decision| decision.reason),
            user_id: identity.map_or(0, |identity| identity.user().id()),
            consumer: identity.map(|identity| identity.consumer().to_string()).unwrap_or_default(),
            policy_revision: decision.map(|decision| decision.revision),
            params,
            error,
        });
        self.keeper.audit.record(&event);
    }
}
