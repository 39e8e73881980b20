// crates/authz-gate-core/src/core/policy.rs
// ============================================================================
// Module: Authz Gate Policy Tree
// Description: Typed service/module/command policy tree and document parsing.
// Purpose: Validate policy documents once at import and resolve rules per call.
// Dependencies: crate::core::{decision, identifiers, rule}, serde, serde_json
// ============================================================================

//! ## Overview
//! A policy document is a three-level JSON object:
//!
//! ```json
//! { "svcA": { "mod1": { "doThing": true, "*": "auth" }, "*": false } }
//! ```
//!
//! Module values are either a bare [`Rule`] (applies to every command) or a
//! command map. Trust descriptors are only recognized at the command level; an
//! object at the module level is always a command map.
//!
//! [`PolicyTree::from_document`] validates the whole document and reports
//! every malformed node with a JSON-pointer path, so a rejected import tells
//! the operator everything that is wrong at once.
//!
//! Security posture: policy documents are operator-supplied but untrusted
//! until validated; nothing reaches the live tree without passing
//! [`PolicyTree::from_document`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::decision::DecisionReason;
use crate::core::identifiers::CommandName;
use crate::core::identifiers::ModuleName;
use crate::core::identifiers::ServiceName;
use crate::core::identifiers::WILDCARD;
use crate::core::rule::AUTHENTICATED_TOKEN;
use crate::core::rule::RoleSet;
use crate::core::rule::Rule;
use crate::core::rule::TrustDescriptor;

// ============================================================================
// SECTION: Policy Tree
// ============================================================================

/// Validated policy tree keyed by service name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyTree {
    /// Service entries, including the optional `*` entry.
    services: BTreeMap<ServiceName, ServicePolicy>,
}

impl PolicyTree {
    /// Creates an empty tree. Every decision against it is `service_not_found`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            services: BTreeMap::new(),
        }
    }

    /// Returns the permissive startup tree `{ "*": { "*": true } }`.
    #[must_use]
    pub fn bootstrap() -> Self {
        let module = ModulePolicy::Rule(Rule::AllowAll);
        Self::new().with_service(
            ServiceName::wildcard(),
            ServicePolicy::new().with_module(ModuleName::wildcard(), module),
        )
    }

    /// Returns the tree with a service entry added or replaced.
    #[must_use]
    pub fn with_service(mut self, name: impl Into<ServiceName>, policy: ServicePolicy) -> Self {
        self.services.insert(name.into(), policy);
        self
    }

    /// Returns the entry for a service name exactly as listed.
    #[must_use]
    pub fn service(&self, name: &ServiceName) -> Option<&ServicePolicy> {
        self.services.get(name)
    }

    /// Iterates service entries in key order.
    pub fn services(&self) -> impl Iterator<Item = (&ServiceName, &ServicePolicy)> {
        self.services.iter()
    }

    /// Returns true when the tree has no service entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Resolves the rule governing a call, applying wildcard fallback per level.
    ///
    /// # Errors
    ///
    /// Returns the `*_not_found` reason for the first level with no entry.
    pub fn resolve(
        &self,
        service: &ServiceName,
        module: &ModuleName,
        command: &CommandName,
    ) -> Result<&Rule, DecisionReason> {
        let service_policy =
            lookup(&self.services, service).ok_or(DecisionReason::ServiceNotFound)?;
        let module_policy =
            lookup(&service_policy.modules, module).ok_or(DecisionReason::ModuleNotFound)?;
        match module_policy {
            ModulePolicy::Rule(rule) => Ok(rule),
            ModulePolicy::Commands(commands) => {
                lookup(commands, command).ok_or(DecisionReason::CommandNotFound)
            }
        }
    }

    /// Parses and validates a raw policy document.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every malformed node.
    pub fn from_document(document: &Value) -> Result<Self, ValidationError> {
        let mut parser = DocumentParser::default();
        let tree = parser.parse_tree(document);
        if parser.violations.is_empty() {
            Ok(tree)
        } else {
            Err(ValidationError {
                violations: parser.violations,
            })
        }
    }

    /// Renders the tree back into its document form.
    #[must_use]
    pub fn to_document(&self) -> Value {
        let mut root = Map::new();
        for (service, policy) in &self.services {
            root.insert(service.to_string(), policy.to_document());
        }
        Value::Object(root)
    }
}

impl Serialize for PolicyTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.services.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolicyTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        Self::from_document(&document).map_err(D::Error::custom)
    }
}

/// Looks up `key`, falling back to the wildcard entry.
fn lookup<'a, K, V>(map: &'a BTreeMap<K, V>, key: &K) -> Option<&'a V>
where
    K: Ord + From<&'static str>,
{
    map.get(key).or_else(|| map.get(&K::from(WILDCARD)))
}

// ============================================================================
// SECTION: Service and Module Policies
// ============================================================================

/// Module entries for one service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ServicePolicy {
    /// Module entries, including the optional `*` entry.
    modules: BTreeMap<ModuleName, ModulePolicy>,
}

impl ServicePolicy {
    /// Creates a service entry with no modules.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Returns the entry with a module added or replaced.
    #[must_use]
    pub fn with_module(mut self, name: impl Into<ModuleName>, policy: ModulePolicy) -> Self {
        self.modules.insert(name.into(), policy);
        self
    }

    /// Returns the entry for a module name exactly as listed.
    #[must_use]
    pub fn module(&self, name: &ModuleName) -> Option<&ModulePolicy> {
        self.modules.get(name)
    }

    /// Iterates module entries in key order.
    pub fn modules(&self) -> impl Iterator<Item = (&ModuleName, &ModulePolicy)> {
        self.modules.iter()
    }

    /// Renders the service entry into document form.
    fn to_document(&self) -> Value {
        let mut modules = Map::new();
        for (module, policy) in &self.modules {
            modules.insert(module.to_string(), policy.to_document());
        }
        Value::Object(modules)
    }
}

/// Policy attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModulePolicy {
    /// One rule for every command in the module.
    Rule(Rule),
    /// Per-command rules, including the optional `*` entry.
    Commands(BTreeMap<CommandName, Rule>),
}

impl ModulePolicy {
    /// Builds a command map from `(command, rule)` pairs.
    #[must_use]
    pub fn commands<I, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, Rule)>,
        C: Into<CommandName>,
    {
        Self::Commands(entries.into_iter().map(|(name, rule)| (name.into(), rule)).collect())
    }

    /// Renders the module entry into document form.
    fn to_document(&self) -> Value {
        match self {
            Self::Rule(rule) => rule_document(rule),
            Self::Commands(commands) => {
                let mut map = Map::new();
                for (command, rule) in commands {
                    map.insert(command.to_string(), rule_document(rule));
                }
                Value::Object(map)
            }
        }
    }
}

/// Renders a rule into document form.
fn rule_document(rule: &Rule) -> Value {
    match rule {
        Rule::AllowAll => Value::Bool(true),
        Rule::DenyAll => Value::Bool(false),
        Rule::RequireAuthenticated => Value::String(AUTHENTICATED_TOKEN.to_string()),
        Rule::RequireAnyRole(roles) => string_array(roles.as_slice()),
        Rule::TrustedService(descriptor) => {
            let mut map = Map::new();
            map.insert("services".to_string(), string_array(&descriptor.services));
            if let Some(roles) = &descriptor.roles {
                map.insert("roles".to_string(), string_array(roles.as_slice()));
            }
            if let Some(auth) = descriptor.auth {
                map.insert("auth".to_string(), Value::Bool(auth));
            }
            Value::Object(map)
        }
    }
}

/// Builds a JSON array of strings.
fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

// ============================================================================
// SECTION: Validation Errors
// ============================================================================

/// Category of a malformed policy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Document root or service entry is not an object.
    ExpectedObject,
    /// Value is not `true`, `false`, `"auth"`, a role list, or a trust descriptor.
    InvalidRule,
    /// String other than `"auth"` where a rule was expected.
    UnknownToken,
    /// Role list contains a non-string or empty entry.
    InvalidRoleList,
    /// Command-level object without a `services` array.
    MissingTrustedServices,
    /// Trust descriptor `services` contains a non-string entry.
    InvalidTrustedServices,
}

impl ViolationKind {
    /// Returns a human-readable description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::ExpectedObject => "expected an object",
            Self::InvalidRule => {
                "expected true, false, \"auth\", a role list, or a trust descriptor"
            }
            Self::UnknownToken => "unknown rule token (only \"auth\" is accepted)",
            Self::InvalidRoleList => "role lists must contain non-empty strings",
            Self::MissingTrustedServices => "trust descriptor requires a services array",
            Self::InvalidTrustedServices => "trust descriptor services must be strings",
        }
    }
}

/// One malformed node in a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// JSON pointer to the offending node (empty for the document root).
    pub path: String,
    /// What is wrong with the node.
    pub kind: ViolationKind,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { self.path.as_str() };
        write!(f, "{path}: {}", self.kind.describe())
    }
}

/// Policy document rejected at import.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid policy document: {}", summarize(.violations))]
pub struct ValidationError {
    /// Every malformed node found, in document order.
    pub violations: Vec<PolicyViolation>,
}

/// Joins violations for display.
fn summarize(violations: &[PolicyViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

// ============================================================================
// SECTION: Document Parser
// ============================================================================

/// Walks a raw document, building the tree and collecting violations.
#[derive(Default)]
struct DocumentParser {
    /// Violations found so far.
    violations: Vec<PolicyViolation>,
}

impl DocumentParser {
    /// Records a violation at `path`.
    fn reject(&mut self, path: &str, kind: ViolationKind) {
        self.violations.push(PolicyViolation {
            path: path.to_string(),
            kind,
        });
    }

    /// Parses the document root.
    fn parse_tree(&mut self, document: &Value) -> PolicyTree {
        let mut tree = PolicyTree::new();
        let Some(services) = document.as_object() else {
            self.reject("", ViolationKind::ExpectedObject);
            return tree;
        };
        for (service, entry) in services {
            let path = pointer("", service);
            if let Some(policy) = self.parse_service(&path, entry) {
                tree.services.insert(ServiceName::new(service.as_str()), policy);
            }
        }
        tree
    }

    /// Parses one service entry.
    fn parse_service(&mut self, path: &str, entry: &Value) -> Option<ServicePolicy> {
        let Some(modules) = entry.as_object() else {
            self.reject(path, ViolationKind::ExpectedObject);
            return None;
        };
        let mut policy = ServicePolicy::new();
        for (module, value) in modules {
            let module_path = pointer(path, module);
            if let Some(parsed) = self.parse_module(&module_path, value) {
                policy.modules.insert(ModuleName::new(module.as_str()), parsed);
            }
        }
        Some(policy)
    }

    /// Parses one module entry: a command map or a bare rule.
    fn parse_module(&mut self, path: &str, value: &Value) -> Option<ModulePolicy> {
        if let Some(commands) = value.as_object() {
            let mut map = BTreeMap::new();
            for (command, rule) in commands {
                let command_path = pointer(path, command);
                if let Some(parsed) = self.parse_command_rule(&command_path, rule) {
                    map.insert(CommandName::new(command.as_str()), parsed);
                }
            }
            return Some(ModulePolicy::Commands(map));
        }
        self.parse_scalar_rule(path, value).map(ModulePolicy::Rule)
    }

    /// Parses a command-level rule, which may also be a trust descriptor.
    fn parse_command_rule(&mut self, path: &str, value: &Value) -> Option<Rule> {
        match value.as_object() {
            Some(descriptor) => self.parse_trust(path, descriptor).map(Rule::TrustedService),
            None => self.parse_scalar_rule(path, value),
        }
    }

    /// Parses the non-object rule forms.
    fn parse_scalar_rule(&mut self, path: &str, value: &Value) -> Option<Rule> {
        match value {
            Value::Bool(true) => Some(Rule::AllowAll),
            Value::Bool(false) => Some(Rule::DenyAll),
            Value::String(token) if token == AUTHENTICATED_TOKEN => {
                Some(Rule::RequireAuthenticated)
            }
            Value::String(_) => {
                self.reject(path, ViolationKind::UnknownToken);
                None
            }
            Value::Array(items) => self.parse_roles(path, items).map(Rule::RequireAnyRole),
            Value::Null | Value::Number(_) | Value::Object(_) => {
                self.reject(path, ViolationKind::InvalidRule);
                None
            }
        }
    }

    /// Parses a role list; every entry must be a non-empty string.
    fn parse_roles(&mut self, path: &str, items: &[Value]) -> Option<RoleSet> {
        let mut roles = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(role) if !role.is_empty() => roles.push(role.to_string()),
                _ => {
                    self.reject(path, ViolationKind::InvalidRoleList);
                    return None;
                }
            }
        }
        Some(RoleSet::new(roles))
    }

    /// Parses a trust descriptor object.
    fn parse_trust(
        &mut self,
        path: &str,
        descriptor: &Map<String, Value>,
    ) -> Option<TrustDescriptor> {
        let Some(Value::Array(entries)) = descriptor.get("services") else {
            self.reject(path, ViolationKind::MissingTrustedServices);
            return None;
        };
        let mut services = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(service) = entry.as_str() else {
                self.reject(&pointer(path, "services"), ViolationKind::InvalidTrustedServices);
                return None;
            };
            services.push(service.to_string());
        }
        let roles = match descriptor.get("roles") {
            Some(Value::Array(items)) => Some(self.parse_roles(&pointer(path, "roles"), items)?),
            _ => None,
        };
        let auth = descriptor.get("auth").map(|flag| matches!(flag, Value::Bool(true)));
        Some(TrustDescriptor {
            services,
            roles,
            auth,
        })
    }
}

/// Appends an RFC 6901 escaped segment to a JSON pointer.
fn pointer(parent: &str, segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    format!("{parent}/{escaped}")
}
