//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use caddyctl_config::ConfigError;
use caddyctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const SYNTHESIS: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Control plane ────────────────────────────────────────────────
    #[error("Could not reach the admin API at {url}")]
    #[diagnostic(
        code(caddyctl::connection_failed),
        help(
            "Check that Caddy is running with its admin endpoint enabled.\n\
             Cause: {reason}\n\
             Try: caddyctl remote health --admin-url {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out{}", after_secs(.seconds))]
    #[diagnostic(
        code(caddyctl::timeout),
        help(
            "The remote state is now unknown. Run `caddyctl sync` to converge,\n\
             or raise the limit with --timeout."
        )
    )]
    Timeout { seconds: Option<u64> },

    #[error("The admin API rejected the request (HTTP {status})")]
    #[diagnostic(
        code(caddyctl::rejected),
        help(
            "{body}\n\n\
             The attempt is recorded: caddyctl history list --type config"
        )
    )]
    Rejected { status: u16, body: String },

    #[error("Admin API error: {message}")]
    #[diagnostic(code(caddyctl::api_error))]
    Api { message: String },

    // ── Synthesis ────────────────────────────────────────────────────
    #[error("Configuration synthesis failed")]
    #[diagnostic(
        code(caddyctl::synthesis),
        help("{message}\nNothing was applied. Fix the route and run `caddyctl sync`.")
    )]
    Synthesis { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(caddyctl::not_found),
        help("Run: caddyctl {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("History entry cannot be restored: {message}")]
    #[diagnostic(code(caddyctl::invalid_snapshot))]
    InvalidSnapshot { message: String },

    #[error("State file error: {message}")]
    #[diagnostic(
        code(caddyctl::state),
        help("Check the --state path or the profile's state_file.")
    )]
    State { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(caddyctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(caddyctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: caddyctl config set-profile {name} --admin-url <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(caddyctl::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(caddyctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(caddyctl::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(caddyctl::json), help("Check the JSON value and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Cannot render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Cannot render TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Synthesis { .. } => exit_code::SYNTHESIS,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn not_found(resource_type: &str, identifier: &str, list_command: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Synthesis(e) => CliError::Synthesis {
                message: e.to_string(),
            },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Apply { status, body } => CliError::Rejected { status, body },

            CoreError::Api { message, .. } => CliError::Api { message },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&entity_type),
                resource_type: entity_type,
                identifier,
            },

            CoreError::InvalidSnapshot { message } => CliError::InvalidSnapshot { message },

            CoreError::Store { message } => CliError::State { message },

            CoreError::Config { message } => CliError::Validation {
                field: "admin_url".into(),
                reason: message,
            },

            CoreError::ControllerStopped => {
                CliError::Internal("command processor stopped unexpectedly".into())
            }

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<caddyctl_api::Error> for CliError {
    fn from(err: caddyctl_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

#[allow(clippy::ref_option)]
fn after_secs(seconds: &Option<u64>) -> String {
    seconds.map_or_else(String::new, |secs| format!(" after {secs}s"))
}

fn list_command_for(entity_type: &str) -> String {
    match entity_type {
        "site" => "sites list".into(),
        "upstream" => "upstreams list".into(),
        "upstream_group" => "groups list".into(),
        "settings" => "settings show".into(),
        "tls_config" => "tls list".into(),
        "dns_provider" => "dns-providers list".into(),
        "certificate" => "certificates list".into(),
        "history entry" => "history list".into(),
        "route" | "redirect" => format!("{entity_type}s list <site>"),
        _ => "history list".into(),
    }
}
