// crud-gate-config/src/config.rs
// ============================================================================
// Module: CRUD Gate Configuration
// Description: Configuration loading and validation for the gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: crud-gate-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file, or JSON when the file ends in
//! `.json`, with strict size and path limits. The secret comes either inline
//! (`secret`) or from a named environment variable (`secret_env`). Rule trees
//! are validated structurally before a gate ever sees them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crud_gate_core::FileStore;
use crud_gate_core::Gate;
use crud_gate_core::RuleSet;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "crud-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CRUD_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum signing secret length in bytes.
pub(crate) const MAX_SECRET_LENGTH: usize = 4096;
/// Maximum database or collection name length.
pub(crate) const MAX_NAME_LENGTH: usize = 255;

// ============================================================================
// SECTION: Gate Config
// ============================================================================

/// Gate configuration loaded from `crud-gate.toml`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Inline signing secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Environment variable holding the signing secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_env: Option<String>,
    /// CRUD rules keyed by database, collection, and operation.
    #[serde(default)]
    pub crud: RuleSet,
    /// Optional file store rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_store: Option<FileStore>,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl GateConfig {
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
        let mut config = if is_json(&resolved) {
            Self::from_json_str(content)?
        } else {
            Self::from_toml_str(content)?
        };
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML without validating.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document does not match the model.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Parses JSON without validating.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document does not match the model.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates the configuration, reading `secret_env` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.validate_with_env(|name| env::var(name).ok())
    }

    /// Validates the configuration, resolving `secret_env` through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate_with_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        self.resolve_secret(lookup)?;
        self.validate_names()?;
        self.crud.validate().map_err(|err| ConfigError::Invalid(format!("crud: {err}")))?;
        if let Some(store) = &self.file_store {
            if store.enabled {
                store
                    .rules
                    .validate()
                    .map_err(|err| ConfigError::Invalid(format!("file_store: {err}")))?;
            }
        }
        Ok(())
    }

    /// Returns the resolved signing secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.as_deref().unwrap_or_default()
    }

    /// Splits the configuration into the values [`Gate::set_config`] accepts.
    #[must_use]
    pub fn into_parts(self) -> (String, RuleSet, Option<FileStore>) {
        (self.secret.unwrap_or_default(), self.crud, self.file_store)
    }

    /// Installs this configuration on a running gate as one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the gate rejects the rules.
    pub fn apply(self, gate: &Gate) -> Result<(), ConfigError> {
        let (secret, rules, file_store) = self.into_parts();
        gate.set_config(secret, rules, file_store)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Builds a new gate from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the gate rejects the rules.
    pub fn build_gate(self) -> Result<Gate, ConfigError> {
        let gate = Gate::new(String::new());
        self.apply(&gate)?;
        Ok(gate)
    }

    /// Resolves the secret from exactly one of `secret` and `secret_env`.
    fn resolve_secret(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if self.secret.is_some() && self.secret_env.is_some() {
            return Err(ConfigError::Invalid(
                "secret and secret_env are mutually exclusive".to_string(),
            ));
        }
        if let Some(name) = self.secret_env.take() {
            let value = lookup(&name)
                .ok_or_else(|| ConfigError::Invalid(format!("secret_env {name} is not set")))?;
            self.secret = Some(value);
        }
        let secret = self.secret();
        if secret.trim().is_empty() {
            return Err(ConfigError::Invalid("secret must be non-empty".to_string()));
        }
        if secret.len() > MAX_SECRET_LENGTH {
            return Err(ConfigError::Invalid("secret exceeds max length".to_string()));
        }
        Ok(())
    }

    /// Rejects empty or oversized database and collection names.
    fn validate_names(&self) -> Result<(), ConfigError> {
        for (database, db_rules) in self.crud.databases() {
            validate_name("database", database)?;
            for collection in db_rules.collections.keys() {
                validate_name("collection", collection)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_env", &self.secret_env)
            .field("crud", &self.crud)
            .field("file_store", &self.file_store)
            .field("source_modified_at", &self.source_modified_at)
            .finish()
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
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
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
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Returns true when the path names a JSON document.
fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Validates a database or collection name.
fn validate_name(kind: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{kind} name must be non-empty")));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{kind} name {name} exceeds max length")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::use_debug,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use std::path::Path;

    use super::GateConfig;
    use super::MAX_PATH_COMPONENT_LENGTH;
    use super::MAX_TOTAL_PATH_LENGTH;
    use super::is_json;
    use super::validate_path;

    #[test]
    fn validate_path_rejects_long_components() {
        let component = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        assert!(validate_path(Path::new(&format!("./{component}"))).is_err());
        let component = "a".repeat(MAX_PATH_COMPONENT_LENGTH);
        assert!(validate_path(Path::new(&format!("./{component}"))).is_ok());
    }

    #[test]
    fn validate_path_rejects_long_paths() {
        let path = "a/".repeat(MAX_TOTAL_PATH_LENGTH);
        assert!(validate_path(Path::new(&path)).is_err());
    }

    #[test]
    fn json_is_chosen_by_extension() {
        assert!(is_json(Path::new("gate.JSON")));
        assert!(!is_json(Path::new("gate.toml")));
        assert!(!is_json(Path::new("gate")));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = GateConfig {
            secret: Some("hunter2".to_string()),
            ..GateConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
