// crud-gate-config/tests/config_validation.rs
// ============================================================================
// Module: Config Loading and Validation Tests
// Description: Validate parsing, secret resolution, and rule validation.
// Purpose: Ensure invalid configuration fails closed before reaching a gate.
// ============================================================================

//! Config loading and validation tests for crud-gate-config.

use std::fs;
use std::sync::Arc;

use crud_gate_config::ConfigError;
use crud_gate_config::GateConfig;
use crud_gate_config::config_toml_example;
use crud_gate_core::Claims;
use crud_gate_core::EvaluationArgs;
use crud_gate_core::FileOperation;
use crud_gate_core::NoopAuditSink;
use crud_gate_core::OperationType;

mod common;
use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::config_from_toml;
use crate::common::ensure;
use crate::common::validate_with_test_env;

const OWNER_CONFIG: &str = r#"
secret = "some-secret"

[crud.mongo.collections.users.rules.read]
rule = "match"
eval = "=="
type = "string"
f1 = "args.auth.id"
f2 = "args.find.owner"

[file_store]
enabled = true
[[file_store.rules]]
prefix = "/public"
[file_store.rules.rules.read]
rule = "allow"
"#;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn example_config_parses_and_validates() -> TestResult {
    let mut config = config_from_toml(&config_toml_example())?;
    validate_with_test_env(&mut config).map_err(|err| err.to_string())?;
    ensure(config.secret() == "env-secret", "secret_env should resolve")?;
    ensure(config.crud.rule_count() == 4, "example should define four CRUD rules")
}

#[test]
fn unknown_top_level_fields_are_rejected() -> TestResult {
    match config_from_toml("secret = \"s\"\nunknown = 1\n") {
        Err(message) if message.contains("unknown") => Ok(()),
        Err(message) => Err(format!("unexpected parse error {message}")),
        Ok(_) => Err("unknown fields should fail".to_string()),
    }
}

#[test]
fn unknown_rule_kinds_fail_validation() -> TestResult {
    let mut config = config_from_toml(
        "secret = \"s\"\n[crud.mongo.collections.users.rules.read]\nrule = \"query\"\n",
    )?;
    assert_invalid(config.validate(), "unsupported rule kind")
}

// ============================================================================
// SECTION: Secrets and Names
// ============================================================================

#[test]
fn secret_is_required() -> TestResult {
    let mut config = config_from_toml("")?;
    assert_invalid(config.validate_with_env(|_| None), "secret must be non-empty")
}

#[test]
fn secret_sources_are_mutually_exclusive() -> TestResult {
    let mut config = config_from_toml("secret = \"a\"\nsecret_env = \"CRUD_GATE_SECRET\"\n")?;
    assert_invalid(validate_with_test_env(&mut config), "mutually exclusive")
}

#[test]
fn unset_secret_env_fails() -> TestResult {
    let mut config = config_from_toml("secret_env = \"CRUD_GATE_MISSING\"\n")?;
    assert_invalid(validate_with_test_env(&mut config), "secret_env CRUD_GATE_MISSING is not set")
}

#[test]
fn empty_collection_names_are_rejected() -> TestResult {
    let mut config = config_from_toml(
        "secret = \"s\"\n[crud.mongo.collections.\"\".rules.read]\nrule = \"allow\"\n",
    )?;
    assert_invalid(config.validate(), "collection name must be non-empty")
}

#[test]
fn relative_file_prefixes_are_rejected() -> TestResult {
    let mut config = config_from_toml(
        "secret = \"s\"\n[file_store]\nenabled = true\n[[file_store.rules]]\nprefix = \"public\"\n",
    )?;
    assert_invalid(config.validate(), "must start with /")
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn load_reads_toml_and_builds_a_working_gate() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("crud-gate.toml");
    fs::write(&path, OWNER_CONFIG).map_err(|err| err.to_string())?;

    let config = GateConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    ensure(config.source_modified_at.is_some(), "modification time should be recorded")?;
    let gate = config
        .build_gate()
        .map_err(|err| err.to_string())?
        .with_audit_sink(Arc::new(NoopAuditSink));

    let token = gate.issue_token(&Claims::new().with("id", "u1")).map_err(|err| err.to_string())?;
    let claims = gate
        .authenticate(&token, "mongo", "users", OperationType::Read)
        .map_err(|err| err.to_string())?;
    let mut find = serde_json::Map::new();
    find.insert("owner".to_string(), serde_json::Value::from("u1"));
    let args = EvaluationArgs::new(&claims).with_find(find);
    gate.authorize("mongo", "users", OperationType::Read, &args).map_err(|err| err.to_string())?;
    gate.authorize_file("/public/a.txt", FileOperation::Read, &claims)
        .map_err(|err| err.to_string())
}

#[test]
fn load_reads_json_by_extension() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("crud-gate.json");
    let document = serde_json::json!({
        "secret": "s",
        "crud": {"mongo": {"collections": {"posts": {"rules": {"read": {"rule": "allow"}}}}}}
    });
    fs::write(&path, document.to_string()).map_err(|err| err.to_string())?;
    let config = GateConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    ensure(config.crud.rule_count() == 1, "json config should define one rule")
}

#[test]
fn load_rejects_oversized_and_missing_files() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    match GateConfig::load(Some(&missing)) {
        Err(ConfigError::Io(_)) => {}
        other => return Err(format!("missing file should be an io error, got {}", describe(&other))),
    }
    let oversized = dir.path().join("big.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    fs::write(&oversized, padding).map_err(|err| err.to_string())?;
    assert_invalid(GateConfig::load(Some(&oversized)), "size limit")
}

fn describe(result: &Result<GateConfig, ConfigError>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(err) => err.to_string(),
    }
}
