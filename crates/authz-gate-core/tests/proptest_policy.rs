//! Policy engine property-based tests.
//!
//! ## Purpose
//! These tests exercise policy resolution with randomized names and role
//! spellings. They are designed to prove fail-closed behavior for unknown
//! services and stable behavior across export/import cycles.
//!
//! ## What is covered
//! - Services absent from the tree always deny.
//! - Role matching ignores ASCII case.
//! - Re-importing an exported tree never changes a decision.
// crates/authz-gate-core/tests/proptest_policy.rs
// ============================================================================
// Module: Policy Property-Based Tests
// Description: Randomized checks for resolution and round-trip invariants.
// Purpose: Ensure decisions fail closed and survive export/import.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use authz_gate_core::PolicyEngine;
use authz_gate_core::User;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

mod common;
use crate::common::decide;
use crate::common::engine_with;
use crate::common::quiet_store;
use crate::common::user;

fn rule_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!(true)),
        Just(json!(false)),
        Just(json!("auth")),
        prop::collection::vec("[a-z]{1,6}", 1..3).prop_map(|roles| json!(roles)),
        prop::collection::vec("[a-z]{1,6}", 0..3)
            .prop_map(|services| json!({"services": services})),
    ]
}

fn module_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        rule_strategy(),
        prop::collection::btree_map("[a-c*]", rule_strategy(), 1..3)
            .prop_map(|commands| json!(commands)),
    ]
}

fn document_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        "[a-c*]",
        prop::collection::btree_map("[a-c*]", module_strategy(), 1..3),
        0..3,
    )
    .prop_map(|services| json!(services))
}

proptest! {
    #[test]
    fn unknown_service_always_denies(
        service in "[d-z]{1,8}",
        module in "[a-z]{1,8}",
        command in "[a-z]{1,8}",
        id in 0u64..5,
    ) {
        let engine = engine_with(&json!({
            "a": {"*": true},
            "b": {"m": {"*": "auth"}}
        }));
        let caller = user(id, &["admin"]);
        prop_assert!(!decide(&engine, &service, &module, &command, &caller, "gateway"));
    }

    #[test]
    fn role_matching_ignores_ascii_case(role in "[a-zA-Z]{1,12}", id in 1u64..1000) {
        let engine = engine_with(&json!({"svc": {"mod": [role.to_ascii_uppercase()]}}));
        let caller = user(id, &[role.to_ascii_lowercase().as_str()]);
        prop_assert!(decide(&engine, "svc", "mod", "cmd", &caller, ""));
        prop_assert!(!decide(&engine, "svc", "mod", "cmd", &User::anonymous(), ""));
    }

    #[test]
    fn reimporting_export_preserves_decisions(
        document in document_strategy(),
        service in "[a-d]",
        module in "[a-d]",
        command in "[a-d]",
        id in 0u64..3,
        consumer in "[a-z]{0,6}",
    ) {
        let store = quiet_store();
        store.import(&document).expect("generated documents are valid");
        let engine = PolicyEngine::new(store.clone());
        let caller = user(id, &["abc", "x"]);
        let before = decide(&engine, &service, &module, &command, &caller, &consumer);
        let digest = store.snapshot().digest.clone();

        store.import(&store.export_document()).expect("export is valid");
        prop_assert_eq!(decide(&engine, &service, &module, &command, &caller, &consumer), before);
        prop_assert_eq!(store.snapshot().digest.clone(), digest);
    }
}
