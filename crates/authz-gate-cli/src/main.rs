// crates/authz-gate-cli/src/main.rs
// ============================================================================
// Module: Authz Gate CLI Entry Point
// Description: Command dispatcher for config, policy, and gate workflows.
// Purpose: Provide offline tooling to validate policies and simulate gates.
// Dependencies: clap, authz-gate-core, authz-gate-config, serde, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The Authz Gate CLI validates `authz-gate.toml`, checks and normalizes
//! policy documents, answers single decisions offline, and runs a params
//! object through a real authorization gate guarding an echo operation.
//! All inputs are untrusted: every file read is size-limited and failures
//! exit non-zero with a message on stderr.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use authz_gate_config::AuthzGateConfig;
use authz_gate_config::MAX_POLICY_DOCUMENT_SIZE;
use authz_gate_config::PolicyFormat;
use authz_gate_config::parse_policy_document;
use authz_gate_core::CommandName;
use authz_gate_core::DecisionContext;
use authz_gate_core::DecisionReason;
use authz_gate_core::FnOperation;
use authz_gate_core::GateParams;
use authz_gate_core::ModuleName;
use authz_gate_core::NoopAuditSink;
use authz_gate_core::PolicyEngine;
use authz_gate_core::PolicyStore;
use authz_gate_core::PolicyTree;
use authz_gate_core::ResultEnvelope;
use authz_gate_core::ServiceName;
use authz_gate_core::User;
use authz_gate_core::ValidationError;
use authz_gate_core::policy_digest;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a params JSON file for `gate simulate`.
const MAX_PARAMS_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "authz-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
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
    /// Policy document utilities.
    Policy {
        /// Selected policy subcommand.
        #[command(subcommand)]
        command: PolicyCommand,
    },
    /// Authorization gate utilities.
    Gate {
        /// Selected gate subcommand.
        #[command(subcommand)]
        command: GateCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an Authz Gate configuration file.
    Validate(ConfigValidateCommand),
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Validate a policy document and print its digest.
    Check(PolicyCheckCommand),
    /// Emit the canonical JSON form of a policy document.
    Normalize(PolicyNormalizeCommand),
    /// Evaluate a single decision against a policy document.
    Decide(PolicyDecideCommand),
}

/// Gate subcommands.
#[derive(Subcommand, Debug)]
enum GateCommand {
    /// Run a params object through a gate guarding an echo operation.
    Simulate(GateSimulateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to authz-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for policy validation.
#[derive(Args, Debug)]
struct PolicyCheckCommand {
    /// Path to the policy document (JSON for `.json`, TOML otherwise).
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

/// Arguments for policy normalization.
#[derive(Args, Debug)]
struct PolicyNormalizeCommand {
    /// Path to the policy document.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Output path for canonical JSON (defaults to stdout).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Arguments for an offline decision.
#[derive(Args, Debug)]
struct PolicyDecideCommand {
    /// Path to the policy document.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Service name (first tree level).
    #[arg(long, value_name = "NAME")]
    service: String,
    /// Module name (second tree level).
    #[arg(long, value_name = "NAME")]
    module: String,
    /// Command name (third tree level).
    #[arg(long, value_name = "NAME")]
    command: String,
    /// Caller user id (`0` is anonymous).
    #[arg(long, value_name = "ID", default_value_t = 0)]
    user_id: u64,
    /// Caller username.
    #[arg(long, value_name = "NAME", default_value = "")]
    username: String,
    /// Caller role (repeatable).
    #[arg(long = "role", value_name = "ROLE")]
    roles: Vec<String>,
    /// Consumer service name of the calling service.
    #[arg(long, value_name = "NAME", default_value = "")]
    consumer: String,
}

/// Arguments for gate simulation.
#[derive(Args, Debug)]
struct GateSimulateCommand {
    /// Optional config file path (built-in defaults when omitted).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Policy document imported after startup (overrides `policy.document`).
    #[arg(long, value_name = "PATH")]
    policy: Option<PathBuf>,
    /// Module name the gate is registered under.
    #[arg(long, value_name = "NAME")]
    module: String,
    /// Command name the gate is registered under.
    #[arg(long, value_name = "NAME")]
    command: String,
    /// Path to a JSON object used as the call params.
    #[arg(long, value_name = "PATH")]
    params: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("authz-gate {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Policy {
            command,
        } => command_policy(command),
        Commands::Gate {
            command,
        } => command_gate(command).await,
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = AuthzGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!(
        "config ok (service: {}, routing marker: {})",
        config.service.name, config.gate.routing_marker
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Policy Commands
// ============================================================================

/// Dispatches policy subcommands.
fn command_policy(command: PolicyCommand) -> CliResult<ExitCode> {
    match command {
        PolicyCommand::Check(command) => command_policy_check(&command),
        PolicyCommand::Normalize(command) => command_policy_normalize(&command),
        PolicyCommand::Decide(command) => command_policy_decide(&command),
    }
}

/// Executes the policy check command.
fn command_policy_check(command: &PolicyCheckCommand) -> CliResult<ExitCode> {
    let tree = load_policy_tree(&command.input)?;
    let digest = policy_digest(&tree)
        .map_err(|err| CliError::new(format!("failed to hash policy: {err}")))?;
    write_stdout_line(&format!(
        "policy ok (services: {}, digest: {digest})",
        tree.services().count()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the policy normalization command.
fn command_policy_normalize(command: &PolicyNormalizeCommand) -> CliResult<ExitCode> {
    let tree = load_policy_tree(&command.input)?;
    let canonical = canonical_policy_bytes(&tree)?;

    if let Some(output) = &command.output {
        fs::write(output, &canonical).map_err(|err| {
            CliError::new(format!("failed to write {}: {err}", output.display()))
        })?;
        write_stdout_line(&format!("canonical policy written to {}", output.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    write_stdout_bytes_with_newline(&canonical)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the offline decision command.
fn command_policy_decide(command: &PolicyDecideCommand) -> CliResult<ExitCode> {
    let document = read_policy_value(&command.input)?;
    let output = decide_offline(&document, command)?;
    write_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// Decision output for `policy decide`.
#[derive(Debug, Serialize)]
struct DecideOutput {
    /// Evaluated service name.
    service: String,
    /// Evaluated module name.
    module: String,
    /// Evaluated command name.
    command: String,
    /// Whether the call would be allowed.
    allowed: bool,
    /// Reason the decision was reached.
    reason: DecisionReason,
}

/// Imports `document` into a fresh, unaudited store and evaluates one decision.
fn decide_offline(document: &Value, command: &PolicyDecideCommand) -> CliResult<DecideOutput> {
    let store = PolicyStore::with_audit(Arc::new(NoopAuditSink));
    store.import(document).map_err(|err| CliError::new(render_validation_error(&err)))?;
    let engine = PolicyEngine::new(store);

    let service = ServiceName::new(command.service.as_str());
    let module = ModuleName::new(command.module.as_str());
    let name = CommandName::new(command.command.as_str());
    let user = User::new(command.user_id, command.username.as_str(), command.roles.iter().cloned());
    let decision = engine.evaluate(&DecisionContext {
        service: &service,
        module: &module,
        command: &name,
        user: &user,
        consumer: &command.consumer,
    });
    Ok(DecideOutput {
        service: command.service.clone(),
        module: command.module.clone(),
        command: command.command.clone(),
        allowed: decision.allowed,
        reason: decision.reason,
    })
}

// ============================================================================
// SECTION: Gate Commands
// ============================================================================

/// Dispatches gate subcommands.
async fn command_gate(command: GateCommand) -> CliResult<ExitCode> {
    match command {
        GateCommand::Simulate(command) => command_gate_simulate(&command).await,
    }
}

/// Executes the gate simulation command.
async fn command_gate_simulate(command: &GateSimulateCommand) -> CliResult<ExitCode> {
    let config = match &command.config {
        Some(path) => AuthzGateConfig::load(Some(path))
            .map_err(|err| CliError::new(format!("failed to load config: {err}")))?,
        None => AuthzGateConfig::default(),
    };
    let policy = command.policy.as_deref().map(read_policy_value).transpose()?;
    let params = read_params(&command.params)?;
    let envelope =
        simulate_call(&config, policy.as_ref(), &command.module, &command.command, params).await?;
    write_json(&envelope)?;
    Ok(ExitCode::SUCCESS)
}

/// Builds a gate from `config`, optionally importing `policy`, and runs one
/// call through it.
async fn simulate_call(
    config: &AuthzGateConfig,
    policy: Option<&Value>,
    module: &str,
    command: &str,
    params: Map<String, Value>,
) -> CliResult<ResultEnvelope> {
    let keeper = config
        .build_gatekeeper()
        .map_err(|err| CliError::new(format!("failed to build gate: {err}")))?;
    if let Some(document) = policy {
        keeper
            .engine()
            .store()
            .import(document)
            .map_err(|err| CliError::new(render_validation_error(&err)))?;
    }
    let echo = FnOperation::new(|params: GateParams| Ok(Value::Object(params.into_payload())));
    let gate = keeper
        .guard(module, command, echo)
        .map_err(|err| CliError::new(format!("failed to register gate: {err}")))?;
    Ok(gate.handle(params).await)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
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

    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads a UTF-8 input file, mapping read failures to CLI errors.
fn read_text_input(path: &Path, kind: &str, max_bytes: usize) -> CliResult<String> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {kind} {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{kind} {} exceeds size limit ({size} > {limit} bytes)",
            path.display()
        )),
    })?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(format!("{kind} {} must be utf-8", path.display())))
}

/// Reads and decodes a policy document without validating its grammar.
fn read_policy_value(path: &Path) -> CliResult<Value> {
    let content = read_text_input(path, "policy document", MAX_POLICY_DOCUMENT_SIZE)?;
    parse_policy_document(&content, PolicyFormat::from_path(path))
        .map_err(|err| CliError::new(format!("failed to parse {}: {err}", path.display())))
}

/// Reads, decodes, and validates a policy document.
fn load_policy_tree(path: &Path) -> CliResult<PolicyTree> {
    let document = read_policy_value(path)?;
    PolicyTree::from_document(&document).map_err(|err| CliError::new(render_validation_error(&err)))
}

/// Reads a params file, which must hold a JSON object.
fn read_params(path: &Path) -> CliResult<Map<String, Value>> {
    let content = read_text_input(path, "params file", MAX_PARAMS_BYTES)?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(params)) => Ok(params),
        Ok(_) => Err(CliError::new(format!(
            "params file {} must hold a JSON object",
            path.display()
        ))),
        Err(err) => Err(CliError::new(format!("failed to parse {}: {err}", path.display()))),
    }
}

/// Renders every violation on its own line.
fn render_validation_error(error: &ValidationError) -> String {
    let mut message = format!("policy document rejected ({} violations)", error.violations.len());
    for violation in &error.violations {
        message.push_str("\n  ");
        message.push_str(&violation.to_string());
    }
    message
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Computes the canonical JSON export of a policy tree.
fn canonical_policy_bytes(tree: &PolicyTree) -> CliResult<Vec<u8>> {
    serde_jcs::to_vec(&tree.to_document())
        .map_err(|err| CliError::new(format!("failed to canonicalize policy: {err}")))
}

/// Writes a value as canonical JSON followed by a newline.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    write_stdout_bytes_with_newline(&bytes)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout with a trailing newline.
fn write_stdout_bytes_with_newline(bytes: &[u8]) -> CliResult<()> {
    let mut buffer = bytes.to_vec();
    buffer.push(b'\n');
    std::io::stdout().write_all(&buffer).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
