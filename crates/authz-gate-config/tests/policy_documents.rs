//! Policy document loading tests for authz-gate-config.
// crates/authz-gate-config/tests/policy_documents.rs
// =============================================================================
// Module: Policy Document Tests
// Description: JSON/TOML policy files, file sources, and startup import.
// Purpose: Ensure policy files load with limits and feed the policy store.
// =============================================================================

use authz_gate_config::AuthzGateConfig;
use authz_gate_config::FilePolicySource;
use authz_gate_config::PolicyFormat;
use authz_gate_config::read_policy_document;
use authz_gate_core::CommandName;
use authz_gate_core::ModuleName;
use authz_gate_core::PolicySource;
use authz_gate_core::PolicySourceError;
use authz_gate_core::PolicyStore;
use authz_gate_core::ServiceName;
use authz_gate_core::User;
use serde_json::json;

mod common;
use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::write_temp;

#[test]
fn format_follows_extension() {
    assert_eq!(PolicyFormat::from_path(std::path::Path::new("p.json")), PolicyFormat::Json);
    assert_eq!(PolicyFormat::from_path(std::path::Path::new("p.JSON")), PolicyFormat::Json);
    assert_eq!(PolicyFormat::from_path(std::path::Path::new("p.toml")), PolicyFormat::Toml);
    assert_eq!(PolicyFormat::from_path(std::path::Path::new("policy")), PolicyFormat::Toml);
}

#[test]
fn json_and_toml_documents_decode_to_the_same_tree() -> TestResult {
    let (_json_dir, json_path) =
        write_temp("policy.json", r#"{"orders": {"invoices": {"list": "auth", "*": ["admin"]}}}"#)?;
    let (_toml_dir, toml_path) =
        write_temp("policy.toml", "[orders.invoices]\nlist = \"auth\"\n\"*\" = [\"admin\"]\n")?;
    let from_json = read_policy_document(&json_path).map_err(|err| err.to_string())?;
    let from_toml = read_policy_document(&toml_path).map_err(|err| err.to_string())?;
    if from_json != from_toml {
        return Err(format!("documents differ: {from_json} vs {from_toml}"));
    }
    let store = PolicyStore::new();
    store.import(&from_toml).map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn oversized_or_malformed_documents_are_rejected() -> TestResult {
    let oversized = format!("{{\"pad\": \"{}\"}}", "x".repeat(1024 * 1024));
    let (_dir, path) = write_temp("policy.json", &oversized)?;
    match read_policy_document(&path) {
        Err(PolicySourceError::Invalid(message)) if message.contains("size limit") => {}
        other => return Err(format!("expected size rejection, got ok={}", other.is_ok())),
    }
    let (_bad_dir, bad_path) = write_temp("policy.json", "{not json")?;
    match read_policy_document(&bad_path) {
        Err(PolicySourceError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got ok={}", other.is_ok())),
    }
}

#[test]
fn file_source_rereads_on_each_fetch() -> TestResult {
    let (_dir, path) = write_temp("policy.json", r#"{"svc": {"mod": false}}"#)?;
    let source = FilePolicySource::new(path.clone());
    let store = PolicyStore::new();
    store.refresh_from(&source).map_err(|err| err.to_string())?;

    std::fs::write(&path, r#"{"svc": {"mod": true}}"#).map_err(|err| err.to_string())?;
    if source.fetch().map_err(|err| err.to_string())? != json!({"svc": {"mod": true}}) {
        return Err("source did not observe file change".to_string());
    }
    let revision = store.refresh_from(&source).map_err(|err| err.to_string())?;
    if revision != 2 {
        return Err(format!("expected revision 2, got {revision}"));
    }
    Ok(())
}

#[test]
fn gatekeeper_imports_startup_policy() -> TestResult {
    let (dir, policy_path) = write_temp("policy.json", r#"{"orders": {"*": "auth"}}"#)?;
    let toml = format!(
        "[service]\nname = \"orders\"\n\n[audit]\nsink = \"none\"\n\n[policy]\ndocument = '{}'\n",
        policy_path.display()
    );
    let config = AuthzGateConfig::from_toml_str(&toml).map_err(|err| err.to_string())?;
    let keeper = config.build_gatekeeper().map_err(|err| err.to_string())?;
    let engine = keeper.engine();
    if engine.store().snapshot().revision != 1 {
        return Err("startup policy not imported".to_string());
    }
    let allowed = engine.decide(
        &ServiceName::new("orders"),
        &ModuleName::new("invoices"),
        &CommandName::new("list"),
        &User::new(4, "ada", ["ops"]),
        "",
    );
    if !allowed {
        return Err("authenticated caller should be allowed".to_string());
    }

    std::fs::write(dir.path().join("policy.json"), r#"{"orders": {"*": 5}}"#)
        .map_err(|err| err.to_string())?;
    assert_invalid(config.build_gatekeeper().map(|_| ()), "policy.document")
}
