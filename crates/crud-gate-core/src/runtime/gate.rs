// crud-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: CRUD Gate
// Description: Authentication and authorization entry points.
// Purpose: Decide every CRUD and file request against one config snapshot.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! The [`Gate`] owns the signing secret, the CRUD rule tree, and the optional
//! file rule table as one versioned snapshot behind a single lock. Readers
//! hold the shared lock for a whole call, so a decision never mixes old and
//! new configuration. Reloads validate first and replace the snapshot
//! wholesale; a rejected reload leaves the active snapshot untouched.
//!
//! Security posture: every missing rule, verification failure, evaluation
//! error, and poisoned lock denies. Each decision is reported to the audit
//! sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use thiserror::Error;

use crate::core::BatchRequest;
use crate::core::Claims;
use crate::core::EvaluationArgs;
use crate::core::FileOperation;
use crate::core::FileRuleNotFound;
use crate::core::FileRuleSet;
use crate::core::FileStore;
use crate::core::OperationType;
use crate::core::Rule;
use crate::core::RuleNotFound;
use crate::core::RuleSet;
use crate::core::RuleValidationError;
use crate::interfaces::RuleDelegate;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::GateAuditEvent;
use crate::runtime::audit::StderrAuditSink;
use crate::runtime::evaluator::EvaluationError;
use crate::runtime::evaluator::RuleEvaluator;
use crate::runtime::token::TokenError;
use crate::runtime::token::TokenService;

// ============================================================================
// SECTION: Audit Event Names
// ============================================================================

/// Event name for CRUD authentication.
const EVENT_CRUD_AUTHENTICATE: &str = "crud_authenticate";
/// Event name for CRUD authorization.
const EVENT_CRUD_AUTHORIZE: &str = "crud_authorize";
/// Event name for batch item authorization.
const EVENT_BATCH_AUTHORIZE: &str = "crud_authorize_batch";
/// Event name for file authentication.
const EVENT_FILE_AUTHENTICATE: &str = "file_authenticate";
/// Event name for file authorization.
const EVENT_FILE_AUTHORIZE: &str = "file_authorize";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Why an authorization was denied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenialReason {
    /// The rule evaluated to false.
    #[error("rule rejected the request")]
    RuleRejected,
    /// The rule could not be evaluated.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Gate failures. Every variant denies the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// No rule is configured for the CRUD target.
    #[error(transparent)]
    RuleNotFound(#[from] RuleNotFound),
    /// No file rule covers the path and operation.
    #[error(transparent)]
    FileRuleNotFound(#[from] FileRuleNotFound),
    /// Token issuing or verification failed.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// The rule denied the request.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(DenialReason),
    /// A reload carried structurally invalid rules.
    #[error("invalid rules: {0}")]
    InvalidRules(#[from] RuleValidationError),
    /// The request cannot be mapped onto a rule.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The configuration lock is poisoned.
    #[error("gate configuration unavailable")]
    ConfigUnavailable,
}

// ============================================================================
// SECTION: Gate State
// ============================================================================

/// One consistent configuration snapshot.
#[derive(Debug, Default)]
struct GateState {
    /// Incremented on every successful reload.
    version: u64,
    /// Token service for the current secret.
    tokens: TokenService,
    /// CRUD rule tree.
    rules: RuleSet,
    /// File rules, present only when the file store is enabled.
    files: Option<FileRuleSet>,
}

impl GateState {
    /// Resolves a file rule, treating a disabled store as "no rule".
    fn file_rule(
        &self,
        path: &str,
        operation: FileOperation,
    ) -> Result<(&Rule, serde_json::Map<String, serde_json::Value>), FileRuleNotFound> {
        let Some(files) = &self.files else {
            return Err(FileRuleNotFound {
                path: path.to_string(),
                operation,
            });
        };
        let found = files.lookup(path, operation)?;
        Ok((found.rule, found.params))
    }
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Authentication and authorization gate shared across request handlers.
pub struct Gate {
    /// Versioned configuration snapshot.
    state: RwLock<GateState>,
    /// Rule evaluator, with an optional `webhook` delegate.
    evaluator: RuleEvaluator,
    /// Decision audit sink.
    audit: Arc<dyn AuditSink>,
}

impl Gate {
    /// Creates a gate with the secret, no rules, and the stderr audit sink.
    ///
    /// Every lookup fails until rules are installed.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(GateState {
                tokens: TokenService::new(secret),
                ..GateState::default()
            }),
            evaluator: RuleEvaluator::new(),
            audit: Arc::new(StderrAuditSink),
        }
    }

    /// Returns a gate that decides `webhook` rules through the delegate.
    #[must_use]
    pub fn with_delegate(mut self, delegate: Arc<dyn RuleDelegate>) -> Self {
        self.evaluator = self.evaluator.with_delegate(delegate);
        self
    }

    /// Returns a gate that reports decisions to the sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    // ------------------------------------------------------------------------
    // CRUD decisions
    // ------------------------------------------------------------------------

    /// Authenticates a caller for a CRUD operation.
    ///
    /// An `allow` rule returns empty claims without looking at the token.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::RuleNotFound`] when no rule is configured, and
    /// [`GateError::Token`] when the token does not verify.
    pub fn authenticate(
        &self,
        token: &str,
        database: &str,
        collection: &str,
        operation: OperationType,
    ) -> Result<Claims, GateError> {
        let mut event = GateAuditEvent::crud(
            EVENT_CRUD_AUTHENTICATE,
            database,
            collection,
            operation.as_str(),
            0,
        );
        let result = self.read_state().and_then(|state| {
            event.config_version = state.version;
            let rule = state.rules.lookup(database, collection, operation)?;
            verify_for_rule(&state.tokens, rule, token, &mut event)
        });
        self.record(event, &result);
        result
    }

    /// Authorizes a CRUD operation against its rule.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::RuleNotFound`] when no rule is configured and
    /// [`GateError::AuthorizationDenied`] when the rule rejects or errors.
    pub fn authorize(
        &self,
        database: &str,
        collection: &str,
        operation: OperationType,
        args: &EvaluationArgs,
    ) -> Result<(), GateError> {
        let mut event = GateAuditEvent::crud(
            EVENT_CRUD_AUTHORIZE,
            database,
            collection,
            operation.as_str(),
            0,
        );
        let result = self.read_state().and_then(|state| {
            event.config_version = state.version;
            let rule = state.rules.lookup(database, collection, operation)?;
            self.decide(rule, args)
        });
        self.record(event, &result);
        result
    }

    /// Authorizes every item of a batch in order, stopping at the first denial.
    ///
    /// All items are decided against the same configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidRequest`] for an empty batch or for items
    /// whose type is not `create`, `update`, or `delete`, and the first denial
    /// otherwise.
    pub fn authorize_batch(
        &self,
        database: &str,
        batch: &BatchRequest,
        claims: &Claims,
    ) -> Result<(), GateError> {
        let state = match self.read_state() {
            Ok(state) => state,
            Err(err) => {
                let event = GateAuditEvent::crud(
                    EVENT_BATCH_AUTHORIZE,
                    database,
                    "",
                    OperationType::Batch.as_str(),
                    0,
                );
                self.record(event, &Err::<(), _>(err.clone()));
                return Err(err);
            }
        };
        if batch.reqs.is_empty() {
            let event = GateAuditEvent::crud(
                EVENT_BATCH_AUTHORIZE,
                database,
                "",
                OperationType::Batch.as_str(),
                state.version,
            );
            let err = GateError::InvalidRequest("batch carries no requests".to_string());
            self.record(event, &Err::<(), _>(err.clone()));
            return Err(err);
        }
        for item in &batch.reqs {
            let event = GateAuditEvent::crud(
                EVENT_BATCH_AUTHORIZE,
                database,
                &item.col,
                item.request_type.as_str(),
                state.version,
            );
            let result = batch_operation(&item.request_type).and_then(|operation| {
                let rule = state.rules.lookup(database, &item.col, operation)?;
                self.decide(rule, &EvaluationArgs::for_batch_item(claims, item))
            });
            self.record(event, &result);
            result?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // File decisions
    // ------------------------------------------------------------------------

    /// Authenticates a caller for a file operation.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::FileRuleNotFound`] when the file store is disabled
    /// or no rule covers the path, and [`GateError::Token`] when the token
    /// does not verify.
    pub fn authenticate_file(
        &self,
        token: &str,
        path: &str,
        operation: FileOperation,
    ) -> Result<Claims, GateError> {
        let mut event = GateAuditEvent::file(EVENT_FILE_AUTHENTICATE, path, operation.as_str(), 0);
        let result = self.read_state().and_then(|state| {
            event.config_version = state.version;
            let (rule, _) = state.file_rule(path, operation)?;
            verify_for_rule(&state.tokens, rule, token, &mut event)
        });
        self.record(event, &result);
        result
    }

    /// Authorizes a file operation; `:name` prefix segments bind under `params`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::FileRuleNotFound`] when no rule applies and
    /// [`GateError::AuthorizationDenied`] when the rule rejects or errors.
    pub fn authorize_file(
        &self,
        path: &str,
        operation: FileOperation,
        claims: &Claims,
    ) -> Result<(), GateError> {
        let mut event = GateAuditEvent::file(EVENT_FILE_AUTHORIZE, path, operation.as_str(), 0);
        let result = self.read_state().and_then(|state| {
            event.config_version = state.version;
            let (rule, params) = state.file_rule(path, operation)?;
            self.decide(rule, &EvaluationArgs::new(claims).with_params(params))
        });
        self.record(event, &result);
        result
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    /// Issues a token for the claims with the current secret.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Token`] when signing fails.
    pub fn issue_token(&self, claims: &Claims) -> Result<String, GateError> {
        Ok(self.read_state()?.tokens.issue(claims)?)
    }

    /// Verifies a token with the current secret.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Token`] when verification fails.
    pub fn verify_token(&self, token: &str) -> Result<Claims, GateError> {
        Ok(self.read_state()?.tokens.verify(token)?)
    }

    // ------------------------------------------------------------------------
    // Reloads
    // ------------------------------------------------------------------------

    /// Replaces the signing secret. Tokens signed with the old secret stop verifying.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ConfigUnavailable`] when the lock is poisoned.
    pub fn set_secret(&self, secret: impl Into<String>) -> Result<(), GateError> {
        let mut state = self.write_state()?;
        state.tokens = TokenService::new(secret);
        state.version = state.version.saturating_add(1);
        Ok(())
    }

    /// Replaces the CRUD rule tree after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidRules`] and keeps the active tree when
    /// validation fails.
    pub fn set_rules(&self, rules: RuleSet) -> Result<(), GateError> {
        rules.validate()?;
        let mut state = self.write_state()?;
        state.rules = rules;
        state.version = state.version.saturating_add(1);
        Ok(())
    }

    /// Replaces secret, CRUD rules, and file rules as one snapshot.
    ///
    /// A disabled or absent file store removes all file rules.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidRules`] and keeps the active snapshot when
    /// any rule fails validation.
    pub fn set_config(
        &self,
        secret: impl Into<String>,
        rules: RuleSet,
        file_store: Option<FileStore>,
    ) -> Result<(), GateError> {
        rules.validate()?;
        let files = file_store.and_then(FileStore::into_active_rules);
        if let Some(files) = &files {
            files.validate()?;
        }
        let mut state = self.write_state()?;
        state.tokens = TokenService::new(secret);
        state.rules = rules;
        state.files = files;
        state.version = state.version.saturating_add(1);
        Ok(())
    }

    /// Returns the active configuration version.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ConfigUnavailable`] when the lock is poisoned.
    pub fn config_version(&self) -> Result<u64, GateError> {
        Ok(self.read_state()?.version)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Evaluates a rule and maps the outcome onto the gate's errors.
    fn decide(&self, rule: &Rule, args: &EvaluationArgs) -> Result<(), GateError> {
        match self.evaluator.evaluate(rule, args) {
            Ok(true) => Ok(()),
            Ok(false) => Err(GateError::AuthorizationDenied(DenialReason::RuleRejected)),
            Err(err) => Err(GateError::AuthorizationDenied(DenialReason::Evaluation(err))),
        }
    }

    /// Records the decision for a finished call.
    fn record<T>(&self, event: GateAuditEvent, result: &Result<T, GateError>) {
        let event = match result {
            Ok(_) => event,
            Err(err) => event.denied(err),
        };
        self.audit.record(&event);
    }

    /// Acquires the shared lock.
    fn read_state(&self) -> Result<RwLockReadGuard<'_, GateState>, GateError> {
        self.state.read().map_err(|_| GateError::ConfigUnavailable)
    }

    /// Acquires the exclusive lock.
    fn write_state(&self) -> Result<RwLockWriteGuard<'_, GateState>, GateError> {
        self.state.write().map_err(|_| GateError::ConfigUnavailable)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Verifies the token unless the rule is public.
fn verify_for_rule(
    tokens: &TokenService,
    rule: &Rule,
    token: &str,
    event: &mut GateAuditEvent,
) -> Result<Claims, GateError> {
    if rule.is_allow() {
        return Ok(Claims::new());
    }
    event.record_token(token);
    Ok(tokens.verify(token)?)
}

/// Parses a batch item type; only writes may appear in a batch.
fn batch_operation(request_type: &str) -> Result<OperationType, GateError> {
    let operation: OperationType =
        request_type.parse().map_err(|_| invalid_batch_type(request_type))?;
    match operation {
        OperationType::Create | OperationType::Update | OperationType::Delete => Ok(operation),
        _ => Err(invalid_batch_type(request_type)),
    }
}

/// Builds the error for an unusable batch item type.
fn invalid_batch_type(request_type: &str) -> GateError {
    GateError::InvalidRequest(format!(
        "batch item type {request_type} is not create, update, or delete"
    ))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
