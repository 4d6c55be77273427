// crud-gate-core/tests/gate_scenarios.rs
// ============================================================================
// Module: Gate Scenario Tests
// Description: End-to-end authentication and authorization flows.
// Purpose: Pin fail-closed behavior of the public gate API.
// ============================================================================

//! ## Overview
//! Exercises the gate the way a request handler would: authenticate with a
//! bearer token, build evaluation arguments from the request body, authorize.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use crud_gate_core::BatchRequest;
use crud_gate_core::Claims;
use crud_gate_core::DelegateError;
use crud_gate_core::DeleteRequest;
use crud_gate_core::DenialReason;
use crud_gate_core::EvaluationArgs;
use crud_gate_core::EvaluationError;
use crud_gate_core::FileOperation;
use crud_gate_core::FileRule;
use crud_gate_core::FileRuleSet;
use crud_gate_core::FileStore;
use crud_gate_core::Gate;
use crud_gate_core::GateError;
use crud_gate_core::OperationType;
use crud_gate_core::ReadRequest;
use crud_gate_core::Rule;
use crud_gate_core::RuleDelegate;
use crud_gate_core::RuleSet;
use crud_gate_core::TokenError;
use crud_gate_core::parse_bearer_header;
use serde_json::json;

mod common;
use crate::common::RecordingSink;
use crate::common::claims_for;
use crate::common::owner_filter;
use crate::common::owner_rule;
use crate::common::quiet_gate;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn owner_gate() -> Gate {
    let gate = quiet_gate("s1");
    let rules = RuleSet::new().with_rule("mongo", "users", OperationType::Read, owner_rule());
    gate.set_rules(rules).expect("rules");
    gate
}

fn read_args(claims: &Claims, owner: &str) -> EvaluationArgs {
    let request = ReadRequest {
        find: owner_filter(owner),
        op: "all".to_string(),
        options: None,
    };
    EvaluationArgs::for_read(claims, &request)
}

struct UrlDelegate;

impl RuleDelegate for UrlDelegate {
    fn decide(&self, url: &str, args: &EvaluationArgs) -> Result<bool, DelegateError> {
        match url {
            "https://policy.local/admins" => Ok(args
                .as_map()
                .get("auth")
                .and_then(|auth| auth.get("role"))
                .is_some_and(|role| role == "admin")),
            _ => Err(DelegateError::Unreachable(url.to_string())),
        }
    }
}

// ============================================================================
// SECTION: CRUD Flows
// ============================================================================

#[test]
fn owner_can_read_own_documents_only() {
    let gate = owner_gate();
    let token = gate.issue_token(&claims_for("u1")).expect("issue");
    let header = format!("Bearer {token}");
    let token = parse_bearer_header(&header).expect("bearer");

    let claims = gate.authenticate(&token, "mongo", "users", OperationType::Read).expect("auth");
    assert_eq!(claims, claims_for("u1"));

    gate.authorize("mongo", "users", OperationType::Read, &read_args(&claims, "u1"))
        .expect("owner allowed");
    let err = gate
        .authorize("mongo", "users", OperationType::Read, &read_args(&claims, "u2"))
        .expect_err("other owner denied");
    assert_eq!(err, GateError::AuthorizationDenied(DenialReason::RuleRejected));
}

#[test]
fn missing_rule_denies_regardless_of_token() {
    let gate = owner_gate();
    let token = gate.issue_token(&claims_for("u1")).expect("issue");
    for candidate in [token.as_str(), "", "garbage"] {
        let err = gate
            .authenticate(candidate, "mongo", "orders", OperationType::Delete)
            .expect_err("no rule");
        assert!(matches!(err, GateError::RuleNotFound(_)));
    }
    let err = gate
        .authorize("mongo", "orders", OperationType::Delete, &EvaluationArgs::default())
        .expect_err("no rule");
    assert_eq!(err.to_string(), "no rule configured for mongo/orders/delete");
}

#[test]
fn public_rules_skip_token_verification() {
    let gate = quiet_gate("s1");
    let rules = RuleSet::new().with_rule("mongo", "posts", OperationType::Read, Rule::Allow);
    gate.set_rules(rules).expect("rules");
    let claims = gate.authenticate("", "mongo", "posts", OperationType::Read).expect("public");
    assert!(claims.is_empty());
    gate.authorize("mongo", "posts", OperationType::Read, &EvaluationArgs::new(&claims))
        .expect("public read");
}

#[test]
fn missing_filter_field_denies_with_evaluation_error() {
    let gate = owner_gate();
    let args = EvaluationArgs::new(&claims_for("u1"));
    let err = gate.authorize("mongo", "users", OperationType::Read, &args).expect_err("denied");
    assert_eq!(
        err,
        GateError::AuthorizationDenied(DenialReason::Evaluation(EvaluationError::MissingField {
            path: "args.find.owner".to_string()
        }))
    );
}

#[test]
fn unverified_claims_never_exceed_public_access() {
    let gate = quiet_gate("s1");
    let rules = RuleSet::new().with_rule("mongo", "users", OperationType::Delete, owner_rule());
    gate.set_rules(rules).expect("rules");
    let err = gate
        .authorize("mongo", "users", OperationType::Delete, &EvaluationArgs::new(&Claims::new()))
        .expect_err("no identity");
    assert!(matches!(err, GateError::AuthorizationDenied(DenialReason::Evaluation(_))));
}

// ============================================================================
// SECTION: Tokens and Reloads
// ============================================================================

#[test]
fn rotated_secret_invalidates_old_tokens() {
    let gate = owner_gate();
    let old = gate.issue_token(&claims_for("u1")).expect("issue");
    gate.set_secret("s2").expect("rotate");
    let err = gate.authenticate(&old, "mongo", "users", OperationType::Read).expect_err("old");
    assert_eq!(err, GateError::Token(TokenError::SignatureInvalid));
    let fresh = gate.issue_token(&claims_for("u1")).expect("issue");
    assert!(gate.verify_token(&fresh).is_ok());
}

#[test]
fn unsigned_and_foreign_algorithm_tokens_are_rejected() {
    let gate = owner_gate();
    for alg in ["none", "HS512", "RS256"] {
        let header = URL_SAFE_NO_PAD.encode(json!({"alg": alg, "typ": "JWT"}).to_string());
        let payload = URL_SAFE_NO_PAD.encode(json!({"id": "u1"}).to_string());
        let token = format!("{header}.{payload}.c2ln");
        let err = gate.authenticate(&token, "mongo", "users", OperationType::Read).expect_err(alg);
        assert_eq!(
            err,
            GateError::Token(TokenError::AlgorithmMismatch {
                found: alg.to_string()
            })
        );
    }
}

#[test]
fn invalid_reload_keeps_previous_rules() {
    let gate = owner_gate();
    let version = gate.config_version().expect("version");
    let invalid = RuleSet::new()
        .with_rule("mongo", "users", OperationType::Read, Rule::Allow)
        .with_rule("mongo", "users", OperationType::Delete, Rule::and(Vec::new()));
    assert!(matches!(gate.set_rules(invalid), Err(GateError::InvalidRules(_))));
    assert_eq!(gate.config_version().expect("version"), version);

    let claims = claims_for("u1");
    assert!(gate.authorize("mongo", "users", OperationType::Read, &read_args(&claims, "u2")).is_err());
}

#[test]
fn reload_between_authenticate_and_authorize_does_not_leak_access() {
    let gate = quiet_gate("s1");
    let public = RuleSet::new().with_rule("mongo", "users", OperationType::Delete, Rule::Allow);
    gate.set_rules(public).expect("public");
    let claims = gate.authenticate("", "mongo", "users", OperationType::Delete).expect("public");
    assert!(claims.is_empty());

    let protected = RuleSet::new().with_rule("mongo", "users", OperationType::Delete, owner_rule());
    gate.set_rules(protected).expect("protected");
    let request = DeleteRequest {
        find: owner_filter("u1"),
        ..DeleteRequest::default()
    };
    let args = EvaluationArgs::for_delete(&claims, &request);
    let err = gate.authorize("mongo", "users", OperationType::Delete, &args).expect_err("denied");
    assert_eq!(
        err,
        GateError::AuthorizationDenied(DenialReason::Evaluation(EvaluationError::MissingField {
            path: "args.auth.id".to_string()
        }))
    );
}

#[test]
fn readers_see_whole_snapshots_during_reloads() {
    let public = RuleSet::new().with_rule("mongo", "users", OperationType::Read, Rule::Allow);
    let private = RuleSet::new().with_rule("mongo", "users", OperationType::Read, Rule::Deny);
    let gate = Arc::new(quiet_gate("s1"));
    gate.set_rules(public.clone()).expect("rules");

    let writer = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            for round in 0..200 {
                let rules = if round % 2 == 0 { public.clone() } else { private.clone() };
                gate.set_rules(rules).expect("reload");
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let args = EvaluationArgs::new(&Claims::new());
                for _ in 0..200 {
                    match gate.authorize("mongo", "users", OperationType::Read, &args) {
                        Ok(())
                        | Err(GateError::AuthorizationDenied(DenialReason::RuleRejected)) => {}
                        other => panic!("unexpected decision {other:?}"),
                    }
                }
            })
        })
        .collect();
    writer.join().expect("writer");
    for reader in readers {
        reader.join().expect("reader");
    }
}

// ============================================================================
// SECTION: Batches, Files, Delegates
// ============================================================================

#[test]
fn batch_stops_at_first_denied_item() {
    let gate = quiet_gate("s1");
    let rules = RuleSet::new()
        .with_rule("mongo", "users", OperationType::Create, Rule::Allow)
        .with_rule("mongo", "orders", OperationType::Delete, owner_rule());
    gate.set_rules(rules).expect("rules");
    let sink = Arc::new(RecordingSink::default());
    let gate = gate.with_audit_sink(sink.clone());

    let batch: BatchRequest = serde_json::from_value(json!({"reqs": [
        {"col": "users", "type": "create", "doc": {"name": "a"}, "op": "one"},
        {"col": "orders", "type": "delete", "find": {"owner": "u2"}, "op": "all"},
        {"col": "users", "type": "create", "doc": {"name": "b"}, "op": "one"}
    ]}))
    .expect("batch");
    let err = gate.authorize_batch("mongo", &batch, &claims_for("u1")).expect_err("denied");
    assert_eq!(err, GateError::AuthorizationDenied(DenialReason::RuleRejected));
    assert_eq!(sink.events().len(), 2);

    let reads: BatchRequest =
        serde_json::from_value(json!({"reqs": [{"col": "users", "type": "read"}]})).expect("batch");
    assert!(matches!(
        gate.authorize_batch("mongo", &reads, &claims_for("u1")),
        Err(GateError::InvalidRequest(_))
    ));

    let events_before = sink.events().len();
    let empty = BatchRequest::default();
    assert!(matches!(
        gate.authorize_batch("mongo", &empty, &Claims::new()),
        Err(GateError::InvalidRequest(_))
    ));
    let events = sink.events();
    assert_eq!(events.len(), events_before + 1);
    assert!(!events[events_before].is_allowed());
}

#[test]
fn file_rules_bind_path_params() {
    let gate = quiet_gate("s1");
    let own_files = Rule::matches(
        crud_gate_core::Comparator::Equals,
        crud_gate_core::ValueType::String,
        crud_gate_core::Operand::field("args.auth.id").expect("f1"),
        crud_gate_core::Operand::field("args.params.user_id").expect("f2"),
    );
    let files = FileRuleSet::new()
        .with_rule(FileRule {
            prefix: "/public".to_string(),
            rules: BTreeMap::from([(FileOperation::Read, Rule::Allow)]),
        })
        .with_rule(FileRule {
            prefix: "/users/:user_id".to_string(),
            rules: BTreeMap::from([(FileOperation::Create, own_files)]),
        });
    let store = FileStore {
        enabled: true,
        rules: files,
    };
    gate.set_config("s1", RuleSet::new(), Some(store.clone())).expect("config");

    let claims = gate.authenticate_file("", "/public/logo.png", FileOperation::Read).expect("public");
    assert!(claims.is_empty());
    gate.authorize_file("/users/u1/a.png", FileOperation::Create, &claims_for("u1")).expect("own");
    assert!(gate.authorize_file("/users/u2/a.png", FileOperation::Create, &claims_for("u1")).is_err());
    assert!(matches!(
        gate.authorize_file("/private/a.png", FileOperation::Read, &claims_for("u1")),
        Err(GateError::FileRuleNotFound(_))
    ));

    let disabled = FileStore {
        enabled: false,
        ..store
    };
    gate.set_config("s1", RuleSet::new(), Some(disabled)).expect("config");
    assert!(matches!(
        gate.authenticate_file("", "/public/logo.png", FileOperation::Read),
        Err(GateError::FileRuleNotFound(_))
    ));
}

#[test]
fn webhook_rules_use_the_registered_delegate() {
    let rules = RuleSet::new()
        .with_rule("mongo", "audit", OperationType::Read, Rule::webhook("https://policy.local/admins"))
        .with_rule("mongo", "audit", OperationType::Delete, Rule::webhook("https://policy.local/down"));

    let without = quiet_gate("s1");
    without.set_rules(rules.clone()).expect("rules");
    let args = EvaluationArgs::new(&Claims::new().with("role", "admin"));
    assert!(matches!(
        without.authorize("mongo", "audit", OperationType::Read, &args),
        Err(GateError::AuthorizationDenied(DenialReason::Evaluation(
            EvaluationError::DelegateUnavailable { .. }
        )))
    ));

    let with = quiet_gate("s1").with_delegate(Arc::new(UrlDelegate));
    with.set_rules(rules).expect("rules");
    with.authorize("mongo", "audit", OperationType::Read, &args).expect("admin");
    let viewer = EvaluationArgs::new(&Claims::new().with("role", "viewer"));
    assert!(with.authorize("mongo", "audit", OperationType::Read, &viewer).is_err());
    assert!(matches!(
        with.authorize("mongo", "audit", OperationType::Delete, &args),
        Err(GateError::AuthorizationDenied(DenialReason::Evaluation(EvaluationError::Delegate(_))))
    ));
}
