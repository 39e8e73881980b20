// crates/authz-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads, policy helpers, and simulation.
// Purpose: Ensure CLI inputs fail closed and commands report real decisions.
// Dependencies: authz-gate-cli main helpers, tempfile, tokio
// ============================================================================

//! ## Overview
//! Exercises the private helpers behind each subcommand without spawning the
//! binary.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use authz_gate_config::AuthzGateConfig;
use authz_gate_core::DecisionReason;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

use super::PolicyDecideCommand;
use super::ReadLimitError;
use super::canonical_policy_bytes;
use super::decide_offline;
use super::load_policy_tree;
use super::read_bytes_with_limit;
use super::read_params;
use super::read_policy_value;
use super::simulate_call;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn decide_command(user_id: u64, roles: &[&str], consumer: &str) -> PolicyDecideCommand {
    PolicyDecideCommand {
        input: PathBuf::from("unused.json"),
        service: "orders".to_string(),
        module: "invoices".to_string(),
        command: "list".to_string(),
        user_id,
        username: String::new(),
        roles: roles.iter().map(|role| (*role).to_string()).collect(),
        consumer: consumer.to_string(),
    }
}

fn quiet_config() -> AuthzGateConfig {
    AuthzGateConfig::from_toml_str("[audit]\nsink = \"none\"\n").expect("config")
}

fn call_params(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_rejects_oversized_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "big.bin", &"x".repeat(64));
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 64);
            assert_eq!(limit, 16);
        }
        _ => panic!("expected size limit rejection"),
    }
    assert_eq!(read_bytes_with_limit(&path, 64).expect("within limit").len(), 64);
}

#[test]
fn read_bytes_with_limit_reports_missing_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        read_bytes_with_limit(&dir.path().join("absent.json"), 16),
        Err(ReadLimitError::Io(_))
    ));
}

#[test]
fn read_params_requires_an_object() {
    let dir = tempfile::tempdir().expect("tempdir");
    let array = write_file(&dir, "params.json", "[1, 2]");
    let err = read_params(&array).err().expect("array rejected");
    assert!(err.to_string().contains("must hold a JSON object"));

    let object = write_file(&dir, "ok.json", r#"{"module": "orders"}"#);
    assert_eq!(read_params(&object).expect("object").get("module"), Some(&json!("orders")));
}

// ============================================================================
// SECTION: Policy Commands
// ============================================================================

#[test]
fn load_policy_tree_lists_every_violation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "policy.json", r#"{"svc": {"a": "root", "b": 3}}"#);
    let message = load_policy_tree(&path).err().expect("invalid policy").to_string();
    assert!(message.starts_with("policy document rejected (2 violations)"));
    assert!(message.contains("/svc/a: unknown rule token"));
    assert!(message.contains("/svc/b: expected true, false"));
}

#[test]
fn toml_policy_normalizes_to_canonical_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        &dir,
        "policy.toml",
        "[orders]\nreports = false\n\n[orders.invoices]\n\"*\" = [\"admin\"]\nlist = \"auth\"\n",
    );
    let tree = load_policy_tree(&path).expect("valid policy");
    let bytes = canonical_policy_bytes(&tree).expect("canonical");
    let canonical = String::from_utf8(bytes).expect("utf-8");
    let expected = r#"{"orders":{"invoices":{"*":["admin"],"list":"auth"},"reports":false}}"#;
    assert_eq!(canonical, expected);
}

#[test]
fn decide_offline_reports_reason() {
    let document =
        json!({"orders": {"invoices": {"list": ["admin"], "*": {"services": ["billing"]}}}});
    let denied = decide_offline(&document, &decide_command(5, &["viewer"], "")).expect("decide");
    assert!(!denied.allowed);
    assert_eq!(denied.reason, DecisionReason::RoleMissing);

    let allowed = decide_offline(&document, &decide_command(5, &["ADMIN"], "")).expect("decide");
    assert!(allowed.allowed);
    assert_eq!(allowed.reason, DecisionReason::RoleMatched);

    let mut unknown = decide_command(5, &["admin"], "");
    unknown.service = "billing".to_string();
    let missing = decide_offline(&document, &unknown).expect("decide");
    assert_eq!(missing.reason, DecisionReason::ServiceNotFound);
}

#[test]
fn decide_offline_rejects_invalid_documents() {
    let err = decide_offline(&json!({"orders": 1}), &decide_command(1, &[], ""))
        .err()
        .expect("invalid document");
    assert!(err.to_string().contains("/orders: expected an object"));
}

#[test]
fn read_policy_value_does_not_validate_grammar() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "policy.json", r#"{"svc": 42}"#);
    assert_eq!(read_policy_value(&path).expect("decodes"), json!({"svc": 42}));
}

// ============================================================================
// SECTION: Gate Simulation
// ============================================================================

#[tokio::test]
async fn simulate_call_echoes_decorated_params_when_allowed() {
    let policy = json!({"_": {"orders": {"list": "auth"}}});
    let envelope = simulate_call(
        &quiet_config(),
        Some(&policy),
        "orders",
        "list",
        call_params(json!({"module": "orders", "User": {"id": 7, "username": "ada"}})),
    )
    .await
    .expect("simulate");
    assert!(envelope.success);
    assert_eq!(envelope.data["authenticated"], json!(true));
    assert_eq!(envelope.data["Consumer"], json!(""));
    assert_eq!(envelope.data["User"]["username"], json!("ada"));
}

#[tokio::test]
async fn simulate_call_reports_gate_failures() {
    let policy = json!({"_": {"orders": {"list": "auth"}}});
    let config = quiet_config();
    let routed = call_params(json!({"module": "orders"}));
    let anonymous = simulate_call(&config, Some(&policy), "orders", "list", routed)
        .await
        .expect("simulate");
    assert!(!anonymous.success);
    assert_eq!(anonymous.data, json!("Unauthorized"));

    let unmarked = call_params(json!({"User": {"id": 7}}));
    let unrouted = simulate_call(&config, Some(&policy), "orders", "list", unmarked)
        .await
        .expect("simulate");
    assert_eq!(unrouted.data, json!("No module pattern found"));
}

#[tokio::test]
async fn simulate_call_uses_bootstrap_policy_without_document() {
    let params = call_params(json!({"module": "any"}));
    let envelope = simulate_call(&quiet_config(), None, "any", "thing", params)
        .await
        .expect("simulate");
    assert!(envelope.success);
}

#[tokio::test]
async fn simulate_call_rejects_empty_registration() {
    let err = simulate_call(&quiet_config(), None, "", "thing", call_params(json!({"module": "x"})))
        .await
        .err()
        .expect("empty module rejected");
    assert!(err.to_string().starts_with("failed to register gate"));
}
