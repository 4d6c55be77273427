// crud-gate-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for crud-gate-config.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use crud_gate_config::ConfigError;
use crud_gate_config::GateConfig;

/// Test result alias carrying a failure message.
pub type TestResult = Result<(), String>;

/// Parses TOML into a `GateConfig` without validating.
pub fn config_from_toml(toml_str: &str) -> Result<GateConfig, String> {
    GateConfig::from_toml_str(toml_str).map_err(|err| err.to_string())
}

/// Validates with an environment that holds only `CRUD_GATE_SECRET`.
pub fn validate_with_test_env(config: &mut GateConfig) -> Result<(), ConfigError> {
    config.validate_with_env(|name| {
        (name == "CRUD_GATE_SECRET").then(|| "env-secret".to_string())
    })
}

/// Fails unless the result is an error whose message contains `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// Fails with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: &str) -> TestResult {
    if condition { Ok(()) } else { Err(message.to_string()) }
}
