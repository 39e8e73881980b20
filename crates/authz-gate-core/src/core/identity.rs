// crates/authz-gate-core/src/core/identity.rs
// ============================================================================
// Module: Authz Gate Identity
// Description: Caller identity normalization and decorated gate params.
// Purpose: Convert untrusted inbound identity payloads into a canonical user.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`IdentityNormalizer`] is the single chokepoint between untrusted request
//! params and rule evaluation. Whatever shape `User` arrives in, rules only
//! ever see a [`User`] whose `id` is a positive whole number or `0`, and whose
//! username and roles are empty for anonymous callers.
//!
//! Security posture: identity fields are caller-supplied and unverified here;
//! authentication happens upstream. Anonymous payloads never contribute roles.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Params Fields
// ============================================================================

/// Params field carrying the caller's user object.
pub const USER_FIELD: &str = "User";
/// Params field carrying the self-declared consumer service name.
pub const CONSUMER_FIELD: &str = "Consumer";
/// Params field carrying the derived authentication flag.
pub const AUTHENTICATED_FIELD: &str = "authenticated";

// ============================================================================
// SECTION: User
// ============================================================================

/// Canonical caller identity.
///
/// # Invariants
/// - An `id` of `0` never carries a username or roles. Every constructor,
///   including deserialization, goes through [`User::new`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "UserRecord")]
pub struct User {
    /// Numeric user id; `0` is anonymous.
    id: u64,
    /// Display name; empty when anonymous.
    username: String,
    /// Role names in payload order; empty when anonymous.
    roles: Vec<String>,
}

/// Wire form of [`User`] before the anonymous invariant is applied.
#[derive(Deserialize)]
struct UserRecord {
    /// Numeric user id.
    #[serde(default)]
    id: u64,
    /// Display name.
    #[serde(default)]
    username: String,
    /// Role names.
    #[serde(default)]
    roles: Vec<String>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self::new(record.id, record.username, record.roles)
    }
}

impl User {
    /// Returns the anonymous user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates an authenticated user. An `id` of `0` yields the anonymous user.
    #[must_use]
    pub fn new<I, S>(id: u64, username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if id == 0 {
            return Self::anonymous();
        }
        Self {
            id,
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the user id; `0` is anonymous.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the held role names.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns true when the user id is positive.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.id > 0
    }

    /// Renders the user as a params value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::from(self.id));
        map.insert("username".to_string(), Value::String(self.username.clone()));
        map.insert(
            "roles".to_string(),
            Value::Array(self.roles.iter().cloned().map(Value::String).collect()),
        );
        Value::Object(map)
    }
}

// ============================================================================
// SECTION: Caller Identity
// ============================================================================

/// Normalized user plus declared consumer for one call.
///
/// # Invariants
/// - `authenticated()` is derived from `user().id` and cannot be set directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallerIdentity {
    /// Normalized user.
    user: User,
    /// Consumer service name, empty when absent.
    consumer: String,
}

impl CallerIdentity {
    /// Creates a caller identity from already-normalized parts.
    #[must_use]
    pub fn new(user: User, consumer: impl Into<String>) -> Self {
        Self {
            user,
            consumer: consumer.into(),
        }
    }

    /// Returns the normalized user.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Returns the declared consumer service name.
    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Returns true when the user is authenticated.
    #[must_use]
    pub const fn authenticated(&self) -> bool {
        self.user.is_authenticated()
    }

    /// Writes `User`, `authenticated`, and `Consumer` into a params map.
    pub fn decorate(&self, params: &mut Map<String, Value>) {
        params.insert(USER_FIELD.to_string(), self.user.to_value());
        params.insert(AUTHENTICATED_FIELD.to_string(), Value::Bool(self.authenticated()));
        params.insert(CONSUMER_FIELD.to_string(), Value::String(self.consumer.clone()));
    }
}

// ============================================================================
// SECTION: Normalizer
// ============================================================================

/// Converts raw request params into a [`CallerIdentity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl IdentityNormalizer {
    /// Normalizes the `User` and `Consumer` fields of raw params.
    ///
    /// Rules:
    /// - `User.id` is kept only when it is a whole number `> 0` that fits
    ///   `u64` (`5` and `5.0` alike), else `0`.
    /// - `username` and `roles` are read only when `id > 0`.
    /// - Non-array `roles` become empty; non-string role entries are dropped.
    /// - A missing or non-string `Consumer` becomes the empty string.
    #[must_use]
    pub fn normalize(params: &Map<String, Value>) -> CallerIdentity {
        let user = params
            .get(USER_FIELD)
            .and_then(Value::as_object)
            .map_or_else(User::anonymous, normalize_user);
        let consumer =
            params.get(CONSUMER_FIELD).and_then(Value::as_str).unwrap_or_default();
        CallerIdentity::new(user, consumer)
    }
}

/// Normalizes a raw user object.
fn normalize_user(raw: &Map<String, Value>) -> User {
    let id = raw.get("id").map_or(0, normalize_id);
    if id == 0 {
        return User::anonymous();
    }
    let username = raw.get("username").and_then(Value::as_str).unwrap_or_default();
    let roles = raw
        .get("roles")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default();
    User::new(id, username, roles)
}

/// Exclusive upper bound of whole `f64` ids that fit `u64` (2^64).
const FLOAT_ID_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Reads a user id: a whole number `> 0` that fits `u64`, else `0`.
fn normalize_id(raw: &Value) -> u64 {
    if let Some(id) = raw.as_u64() {
        return id;
    }
    match raw.as_f64() {
        Some(id) if id > 0.0 && id < FLOAT_ID_LIMIT && id.fract() == 0.0 => whole_id(id),
        _ => 0,
    }
}

/// Converts a positive whole `f64` below 2^64 to `u64`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Callers pass positive whole numbers below 2^64."
)]
fn whole_id(id: f64) -> u64 {
    id as u64
}

// ============================================================================
// SECTION: Gate Params
// ============================================================================

/// Decorated params handed to a guarded operation.
#[derive(Debug, Clone, PartialEq)]
pub struct GateParams {
    /// Normalized caller.
    identity: CallerIdentity,
    /// Params with `User`, `authenticated`, and `Consumer` injected.
    payload: Map<String, Value>,
}

impl GateParams {
    /// Normalizes raw params and injects the identity fields.
    #[must_use]
    pub fn decorate(mut payload: Map<String, Value>) -> Self {
        let identity = IdentityNormalizer::normalize(&payload);
        identity.decorate(&mut payload);
        Self {
            identity,
            payload,
        }
    }

    /// Returns the normalized caller.
    #[must_use]
    pub const fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Returns the normalized user.
    #[must_use]
    pub const fn user(&self) -> &User {
        self.identity.user()
    }

    /// Returns the declared consumer service name.
    #[must_use]
    pub fn consumer(&self) -> &str {
        self.identity.consumer()
    }

    /// Returns a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Returns the decorated payload.
    #[must_use]
    pub const fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Consumes the params, returning the decorated payload.
    #[must_use]
    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }

    /// Copies this caller's `User` and `Consumer` into outbound params.
    #[must_use]
    pub fn forward(&self, mut outbound: Map<String, Value>) -> Map<String, Value> {
        outbound.insert(USER_FIELD.to_string(), self.user().to_value());
        outbound.insert(CONSUMER_FIELD.to_string(), Value::String(self.consumer().to_string()));
        outbound
    }
}
