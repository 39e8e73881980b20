// crates/authz-gate-config/src/config.rs
// ============================================================================
// Module: Authz Gate Configuration
// Description: Configuration loading and validation for the authorization gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: authz-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed; unknown keys are rejected so
//! a typo never silently falls back to a default.
//!
//! ```toml
//! [service]
//! name = "orders"
//!
//! [gate]
//! routing_marker = "module"
//!
//! [audit]
//! sink = "file"
//! path = "/var/log/authz-gate.jsonl"
//!
//! [policy]
//! document = "policy.json"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use authz_gate_core::DEFAULT_ROUTING_MARKER;
use authz_gate_core::DEFAULT_SERVICE_NAME;
use authz_gate_core::FileAuditSink;
use authz_gate_core::GateAuditSink;
use authz_gate_core::GateSettings;
use authz_gate_core::Gatekeeper;
use authz_gate_core::NoopAuditSink;
use authz_gate_core::PolicyEngine;
use authz_gate_core::PolicyStore;
use authz_gate_core::ServiceName;
use authz_gate_core::StderrAuditSink;
use authz_gate_core::WILDCARD;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::policy_document::FilePolicySource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "authz-gate.toml";
/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "AUTHZ_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum service name length in bytes.
pub(crate) const MAX_SERVICE_NAME_LENGTH: usize = 128;
/// Maximum routing marker length in bytes.
pub(crate) const MAX_ROUTING_MARKER_LENGTH: usize = 128;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level `authz-gate.toml` configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthzGateConfig {
    /// Service identity.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Gate routing settings.
    #[serde(default)]
    pub gate: GateConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Startup policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name matched against the first policy tree level.
    #[serde(default = "default_service_name")]
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl ServiceConfig {
    /// Validates the service name.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("service.name must be non-empty".to_string()));
        }
        if self.name.len() > MAX_SERVICE_NAME_LENGTH {
            return Err(ConfigError::Invalid("service.name exceeds max length".to_string()));
        }
        if self.name == WILDCARD {
            return Err(ConfigError::Invalid(
                "service.name must not be the wildcard \"*\"".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gate routing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Params field every dispatched call must carry.
    #[serde(default = "default_routing_marker")]
    pub routing_marker: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            routing_marker: default_routing_marker(),
        }
    }
}

impl GateConfig {
    /// Validates the routing marker.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.routing_marker.trim().is_empty() {
            return Err(ConfigError::Invalid("gate.routing_marker must be non-empty".to_string()));
        }
        if self.routing_marker.len() > MAX_ROUTING_MARKER_LENGTH {
            return Err(ConfigError::Invalid("gate.routing_marker exceeds max length".to_string()));
        }
        Ok(())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Discard audit events.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path (JSON lines), required for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => Err(ConfigError::Invalid(
                "audit.path is required when audit.sink = \"file\"".to_string(),
            )),
            (AuditSinkKind::Stderr | AuditSinkKind::None, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only allowed when audit.sink = \"file\"".to_string(),
            )),
            (AuditSinkKind::Stderr | AuditSinkKind::None, None) => Ok(()),
        }
    }
}

/// Startup policy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Optional policy document imported at startup.
    #[serde(default)]
    pub document: Option<String>,
}

impl PolicyConfig {
    /// Validates the policy document path.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.document {
            validate_path_string("policy.document", path)?;
        }
        Ok(())
    }
}

/// Default service name.
fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

/// Default routing marker.
fn default_routing_marker() -> String {
    DEFAULT_ROUTING_MARKER.to_string()
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl AuthzGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.gate.validate()?;
        self.audit.validate()?;
        self.policy.validate()?;
        Ok(())
    }

    /// Returns the core gate settings.
    #[must_use]
    pub fn gate_settings(&self) -> GateSettings {
        GateSettings {
            service_name: ServiceName::new(self.service.name.as_str()),
            routing_marker: self.gate.routing_marker.clone(),
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_audit_sink(&self) -> Result<Arc<dyn GateAuditSink>, ConfigError> {
        match (self.audit.sink, &self.audit.path) {
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::File, Some(path)) => {
                let sink = FileAuditSink::new(Path::new(path))
                    .map_err(|err| ConfigError::Io(format!("audit.path: {err}")))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::File, None) => Err(ConfigError::Invalid(
                "audit.path is required when audit.sink = \"file\"".to_string(),
            )),
        }
    }

    /// Returns the startup policy source, when configured.
    #[must_use]
    pub fn policy_source(&self) -> Option<FilePolicySource> {
        self.policy.document.as_deref().map(|path| FilePolicySource::new(PathBuf::from(path)))
    }

    /// Builds a gatekeeper with the configured audit sink, importing the
    /// startup policy document when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the audit sink cannot be built or the
    /// startup policy cannot be loaded.
    pub fn build_gatekeeper(&self) -> Result<Gatekeeper, ConfigError> {
        let audit = self.build_audit_sink()?;
        let store = PolicyStore::with_audit(Arc::clone(&audit));
        if let Some(source) = self.policy_source() {
            store
                .refresh_from(&source)
                .map_err(|err| ConfigError::Invalid(format!("policy.document: {err}")))?;
        }
        Ok(Gatekeeper::new(PolicyEngine::new(store), self.gate_settings(), audit))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI input or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if Path::new(trimmed)
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid(format!("{field} path component too long")));
    }
    Ok(())
}
