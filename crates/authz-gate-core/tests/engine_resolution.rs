// crates/authz-gate-core/tests/engine_resolution.rs
// ============================================================================
// Module: Policy Engine Resolution Tests
// Description: Wildcard precedence and rule semantics of the policy engine.
// Purpose: Ensure decisions follow exact-over-wildcard resolution and fail closed.
// Dependencies: authz-gate-core, serde_json
// ============================================================================

//! Policy engine decision tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use authz_gate_core::CommandName;
use authz_gate_core::DecisionContext;
use authz_gate_core::DecisionReason;
use authz_gate_core::ModuleName;
use authz_gate_core::PolicyEngine;
use authz_gate_core::PolicyStore;
use authz_gate_core::ServiceName;
use authz_gate_core::User;
use serde_json::json;

mod common;
use crate::common::decide;
use crate::common::engine_with;
use crate::common::user;

fn reason_for(
    engine: &PolicyEngine,
    (service, module, command): (&str, &str, &str),
    user: &User,
    consumer: &str,
) -> DecisionReason {
    let decision = engine.evaluate(&DecisionContext {
        service: &ServiceName::new(service),
        module: &ModuleName::new(module),
        command: &CommandName::new(command),
        user,
        consumer,
    });
    assert_eq!(decision.allowed, decision.reason.allows());
    decision.reason
}

#[test]
fn bootstrap_store_allows_everything() {
    let engine = PolicyEngine::new(PolicyStore::new());
    assert!(decide(&engine, "any", "thing", "goes", &User::anonymous(), ""));
}

#[test]
fn missing_service_denies() {
    let engine = engine_with(&json!({"svcA": {"*": true}}));
    let anonymous = User::anonymous();
    assert!(!decide(&engine, "svcB", "mod", "cmd", &anonymous, ""));
    assert_eq!(
        reason_for(&engine, ("svcB", "mod", "cmd"), &anonymous, ""),
        DecisionReason::ServiceNotFound
    );
}

#[test]
fn missing_module_and_command_deny() {
    let engine = engine_with(&json!({"svc": {"mod": {"cmd": true}}}));
    let anonymous = User::anonymous();
    assert_eq!(
        reason_for(&engine, ("svc", "other", "cmd"), &anonymous, ""),
        DecisionReason::ModuleNotFound
    );
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "other"), &anonymous, ""),
        DecisionReason::CommandNotFound
    );
}

#[test]
fn exact_service_does_not_fall_back_to_wildcard() {
    let engine = engine_with(&json!({
        "svc": {"mod": false},
        "*": {"*": true}
    }));
    let anonymous = User::anonymous();
    assert!(!decide(&engine, "svc", "mod", "cmd", &anonymous, ""));
    assert_eq!(
        reason_for(&engine, ("svc", "other", "cmd"), &anonymous, ""),
        DecisionReason::ModuleNotFound
    );
    assert!(decide(&engine, "elsewhere", "mod", "cmd", &anonymous, ""));
}

#[test]
fn exact_module_wins_over_wildcard_module() {
    let engine = engine_with(&json!({"svc": {"*": false, "mod": true}}));
    let anonymous = User::anonymous();
    assert!(decide(&engine, "svc", "mod", "anyCmd", &anonymous, ""));
    assert!(!decide(&engine, "svc", "other", "anyCmd", &anonymous, ""));
}

#[test]
fn exact_command_wins_over_wildcard_command() {
    let engine = engine_with(&json!({"svc": {"mod": {"*": true, "drop": false}}}));
    let anonymous = User::anonymous();
    assert!(decide(&engine, "svc", "mod", "read", &anonymous, ""));
    assert!(!decide(&engine, "svc", "mod", "drop", &anonymous, ""));
}

#[test]
fn auth_rule_requires_positive_id() {
    let engine = engine_with(&json!({"svc": {"mod": "auth"}}));
    assert!(decide(&engine, "svc", "mod", "cmd", &user(3, &[]), ""));
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "cmd"), &User::anonymous(), ""),
        DecisionReason::NotAuthenticated
    );
}

#[test]
fn role_rule_matches_case_insensitively_for_authenticated_users() {
    let engine = engine_with(&json!({"svc": {"mod": {"cmd": ["Admin"]}}}));
    assert!(decide(&engine, "svc", "mod", "cmd", &user(5, &["admin"]), ""));
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "cmd"), &user(5, &["user"]), ""),
        DecisionReason::RoleMissing
    );
    let spoofed = User::new(0, "mallory", ["admin"]);
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "cmd"), &spoofed, ""),
        DecisionReason::NotAuthenticated
    );
}

#[test]
fn trusted_service_roles_require_an_authenticated_caller() {
    let engine = engine_with(&json!({"svc": {"mod": {
        "trust": {"services": ["gw"], "roles": ["admin"]},
        "roles": ["admin"]
    }}}));
    let spoofed: User =
        serde_json::from_value(json!({"id": 0, "roles": ["admin"]})).expect("deserialize user");
    for command in ["trust", "roles"] {
        assert_eq!(
            reason_for(&engine, ("svc", "mod", command), &spoofed, "gw"),
            DecisionReason::NotAuthenticated
        );
        assert_eq!(
            reason_for(&engine, ("svc", "mod", command), &User::anonymous(), "gw"),
            DecisionReason::NotAuthenticated
        );
    }
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "trust"), &user(4, &["admin"]), "gw"),
        DecisionReason::TrustedService
    );
}

#[test]
fn trusted_service_checks_consumer_only() {
    let engine = engine_with(&json!({"svc": {"mod": {"cmd": {"services": ["gateway"]}}}}));
    assert!(decide(&engine, "svc", "mod", "cmd", &User::anonymous(), "gateway"));
    assert!(decide(&engine, "svc", "mod", "cmd", &user(9, &["ops"]), "gateway"));
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "cmd"), &User::anonymous(), "other"),
        DecisionReason::UntrustedService
    );
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "cmd"), &User::anonymous(), ""),
        DecisionReason::UntrustedService
    );
}

#[test]
fn trusted_service_auth_flag_and_roles_tighten_only() {
    let engine = engine_with(&json!({"svc": {"mod": {
        "flagged": {"services": ["gateway"], "auth": true},
        "disabled": {"services": ["gateway"], "auth": false},
        "roled": {"services": ["gateway"], "roles": ["OPS"]}
    }}}));
    let anonymous = User::anonymous();
    assert!(decide(&engine, "svc", "mod", "flagged", &anonymous, "gateway"));
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "disabled"), &anonymous, "gateway"),
        DecisionReason::TrustDisabled
    );
    assert!(decide(&engine, "svc", "mod", "roled", &user(2, &["ops"]), "gateway"));
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "roled"), &user(2, &["dev"]), "gateway"),
        DecisionReason::RoleMissing
    );
}

#[test]
fn false_rule_denies_even_trusted_callers() {
    let engine = engine_with(&json!({"svc": {"mod": {"cmd": false}}}));
    assert_eq!(
        reason_for(&engine, ("svc", "mod", "cmd"), &user(1, &["admin"]), "gateway"),
        DecisionReason::DenyAll
    );
}

#[test]
fn decisions_report_the_live_revision() {
    let store = PolicyStore::new();
    let engine = PolicyEngine::new(store.clone());
    let context_user = User::anonymous();
    let service = ServiceName::new("svc");
    let module = ModuleName::new("mod");
    let command = CommandName::new("cmd");
    let context = DecisionContext {
        service: &service,
        module: &module,
        command: &command,
        user: &context_user,
        consumer: "",
    };
    assert_eq!(engine.evaluate(&context).revision, 0);
    store.import(&json!({"svc": {"mod": true}})).expect("import");
    let decision = engine.evaluate(&context);
    assert_eq!(decision.revision, 1);
    assert_eq!(decision.reason, DecisionReason::AllowAll);
}
