// crud-gate-cli/src/main.rs
// ============================================================================
// Module: CRUD Gate CLI Entry Point
// Description: Command dispatcher for config, token, and authorization checks.
// Purpose: Exercise a gate configuration offline before deploying it.
// Dependencies: clap, crud-gate-config, crud-gate-core, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The CRUD gate CLI loads a gate configuration and runs the same decisions a
//! gateway would: validate the config, issue or verify tokens, and
//! authenticate plus authorize a single request. Security posture: inputs are
//! untrusted; request and claim payloads are size-limited and every failure
//! exits non-zero.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use crud_gate_config::GateConfig;
use crud_gate_config::config_toml_example;
use crud_gate_core::AggregateRequest;
use crud_gate_core::BatchRequest;
use crud_gate_core::Claims;
use crud_gate_core::CreateRequest;
use crud_gate_core::DeleteRequest;
use crud_gate_core::EvaluationArgs;
use crud_gate_core::Gate;
use crud_gate_core::GateError;
use crud_gate_core::NoopAuditSink;
use crud_gate_core::OperationType;
use crud_gate_core::ReadRequest;
use crud_gate_core::StderrAuditSink;
use crud_gate_core::UpdateRequest;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum request or claims payload size in bytes.
const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "crud-gate", disable_help_subcommand = true)]
struct Cli {
    /// Config file path (overrides `CRUD_GATE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Emit decision audit events to stderr.
    #[arg(long, global = true)]
    audit: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Token issuing and verification.
    Token {
        /// Selected token subcommand.
        #[command(subcommand)]
        command: TokenCommand,
    },
    /// Authenticate and authorize one CRUD request.
    Authorize(AuthorizeCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a gate configuration file.
    Validate,
    /// Print a canonical example configuration.
    Example,
}

/// Token subcommands.
#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue a token for a JSON claims object.
    Issue(TokenIssueCommand),
    /// Verify a token and print its claims.
    Verify(TokenVerifyCommand),
}

/// Arguments for `token issue`.
#[derive(Args, Debug)]
struct TokenIssueCommand {
    /// Claims as an inline JSON object.
    #[arg(long, value_name = "JSON", conflicts_with = "claims_file")]
    claims: Option<String>,
    /// Claims read from a JSON file.
    #[arg(long, value_name = "PATH")]
    claims_file: Option<PathBuf>,
}

/// Arguments for `token verify`.
#[derive(Args, Debug)]
struct TokenVerifyCommand {
    /// Token to verify.
    #[arg(long)]
    token: String,
}

/// Arguments for `authorize`.
#[derive(Args, Debug)]
struct AuthorizeCommand {
    /// Database identifier.
    #[arg(long)]
    db: String,
    /// Collection name.
    #[arg(long)]
    collection: String,
    /// Operation: create, read, update, delete, aggregate, or batch.
    #[arg(long)]
    op: String,
    /// Bearer token; omitted means an empty token.
    #[arg(long)]
    token: Option<String>,
    /// Request body as inline JSON.
    #[arg(long, value_name = "JSON", conflicts_with = "request_file")]
    request: Option<String>,
    /// Request body read from a JSON file.
    #[arg(long, value_name = "PATH")]
    request_file: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors from bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// I/O failure while reading.
    #[error("{0}")]
    Io(std::io::Error),
    /// The file exceeds the limit.
    #[error("file size {size} exceeds limit {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config {
            command,
        } => command_config(&command, cli.config.as_deref()),
        Commands::Token {
            command,
        } => {
            let gate = load_gate(cli.config.as_deref(), cli.audit)?;
            command_token(&command, &gate)
        }
        Commands::Authorize(command) => {
            let gate = load_gate(cli.config.as_deref(), cli.audit)?;
            command_authorize(&command, &gate)
        }
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand, path: Option<&Path>) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            let config = GateConfig::load(path)
                .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
            write_json_line(&json!({
                "status": "ok",
                "rules": config.crud.rule_count(),
                "file_store": config.file_store.as_ref().is_some_and(|store| store.enabled),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommand::Example => {
            write_stdout(&config_toml_example())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads the configuration and builds a gate from it.
fn load_gate(path: Option<&Path>, audit: bool) -> CliResult<Gate> {
    let config = GateConfig::load(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let gate = config
        .build_gate()
        .map_err(|err| CliError::new(format!("failed to build gate: {err}")))?;
    Ok(if audit {
        gate.with_audit_sink(Arc::new(StderrAuditSink))
    } else {
        gate.with_audit_sink(Arc::new(NoopAuditSink))
    })
}

// ============================================================================
// SECTION: Token Commands
// ============================================================================

/// Dispatches token subcommands.
fn command_token(command: &TokenCommand, gate: &Gate) -> CliResult<ExitCode> {
    match command {
        TokenCommand::Issue(command) => {
            let claims: Claims = read_payload(
                command.claims.as_deref(),
                command.claims_file.as_deref(),
                "claims",
            )?
            .ok_or_else(|| CliError::new("--claims or --claims-file is required".to_string()))?;
            let token = gate
                .issue_token(&claims)
                .map_err(|err| CliError::new(format!("failed to issue token: {err}")))?;
            write_stdout(&token)?;
            Ok(ExitCode::SUCCESS)
        }
        TokenCommand::Verify(command) => match gate.verify_token(&command.token) {
            Ok(claims) => {
                write_json_line(&json!({"valid": true, "claims": claims}))?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                write_json_line(&json!({"valid": false, "reason": err.to_string()}))?;
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

// ============================================================================
// SECTION: Authorize Command
// ============================================================================

/// Authenticates and authorizes one request, printing the decision.
fn command_authorize(command: &AuthorizeCommand, gate: &Gate) -> CliResult<ExitCode> {
    let operation: OperationType =
        command.op.parse().map_err(|err| CliError::new(format!("{err}")))?;
    let body: Value =
        read_payload(command.request.as_deref(), command.request_file.as_deref(), "request")?
            .unwrap_or_else(|| json!({}));
    let token = command.token.as_deref().unwrap_or_default();

    let decision = decide(gate, command, operation, token, body)?;
    match decision {
        Ok(claims) => {
            write_json_line(&json!({"decision": "allow", "claims": claims}))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(reason) => {
            write_json_line(&json!({"decision": "deny", "reason": reason}))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Runs authentication then authorization; the inner error is the deny reason.
fn decide(
    gate: &Gate,
    command: &AuthorizeCommand,
    operation: OperationType,
    token: &str,
    body: Value,
) -> CliResult<Result<Claims, String>> {
    if operation == OperationType::Batch {
        let batch: BatchRequest = decode_body(body)?;
        let claims = match authenticate_batch(gate, &command.db, &batch, token) {
            Ok(claims) => claims,
            Err(err) => return Ok(Err(err.to_string())),
        };
        return Ok(gate
            .authorize_batch(&command.db, &batch, &claims)
            .map(|()| claims)
            .map_err(|err| err.to_string()));
    }
    let claims = match gate.authenticate(token, &command.db, &command.collection, operation) {
        Ok(claims) => claims,
        Err(err) => return Ok(Err(err.to_string())),
    };
    let args = request_args(operation, &claims, body)?;
    Ok(gate
        .authorize(&command.db, &command.collection, operation, &args)
        .map(|()| claims)
        .map_err(|err| err.to_string()))
}

/// Authenticates every batch item's target and returns the verified claims.
///
/// Items with an unknown request type are left for
/// [`Gate::authorize_batch`] to reject.
fn authenticate_batch(
    gate: &Gate,
    database: &str,
    batch: &BatchRequest,
    token: &str,
) -> Result<Claims, GateError> {
    let mut claims = Claims::new();
    for item in &batch.reqs {
        let Ok(operation) = item.request_type.parse::<OperationType>() else {
            continue;
        };
        let verified = gate.authenticate(token, database, &item.col, operation)?;
        if !verified.is_empty() {
            claims = verified;
        }
    }
    Ok(claims)
}

/// Builds evaluation arguments from the request body for the operation.
fn request_args(
    operation: OperationType,
    claims: &Claims,
    body: Value,
) -> CliResult<EvaluationArgs> {
    Ok(match operation {
        OperationType::Create => {
            EvaluationArgs::for_create(claims, &decode_body::<CreateRequest>(body)?)
        }
        OperationType::Read => EvaluationArgs::for_read(claims, &decode_body::<ReadRequest>(body)?),
        OperationType::Update => {
            EvaluationArgs::for_update(claims, &decode_body::<UpdateRequest>(body)?)
        }
        OperationType::Delete => {
            EvaluationArgs::for_delete(claims, &decode_body::<DeleteRequest>(body)?)
        }
        OperationType::Aggregate => {
            EvaluationArgs::for_aggregate(claims, &decode_body::<AggregateRequest>(body)?)
        }
        OperationType::Batch => EvaluationArgs::new(claims),
    })
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a JSON payload from an inline string or a file.
fn read_payload<T: DeserializeOwned>(
    inline: Option<&str>,
    file: Option<&Path>,
    kind: &str,
) -> CliResult<Option<T>> {
    let bytes = match (inline, file) {
        (Some(text), _) => {
            if text.len() > MAX_PAYLOAD_BYTES {
                return Err(CliError::new(format!("{kind} exceeds size limit")));
            }
            text.as_bytes().to_vec()
        }
        (None, Some(path)) => read_bytes_with_limit(path, MAX_PAYLOAD_BYTES).map_err(|err| {
            CliError::new(format!("failed to read {kind} file {}: {err}", path.display()))
        })?,
        (None, None) => return Ok(None),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| CliError::new(format!("invalid {kind} json: {err}")))
}

/// Decodes a request body into its typed form.
fn decode_body<T: DeserializeOwned>(body: Value) -> CliResult<T> {
    serde_json::from_value(body).map_err(|err| CliError::new(format!("invalid request body: {err}")))
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a JSON value as one line to stdout.
fn write_json_line(value: &Value) -> CliResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    write_stdout(&line)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
