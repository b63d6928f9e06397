//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use hconnect_config::ConfigError;
use hconnect_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach Home Connect at {url}")]
    #[diagnostic(
        code(hconnect::connection_failed),
        help("Check network access, or the api_url in your config.\nReason: {reason}")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Rate limited by Home Connect")]
    #[diagnostic(
        code(hconnect::rate_limited),
        help("Wait {retry_after_secs}s before trying again.")
    )]
    RateLimited { retry_after_secs: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(hconnect::auth_failed),
        help("Link the account again with: hconnect auth url, then hconnect auth login")
    )]
    AuthFailed { message: String },

    #[error("No OAuth client configured")]
    #[diagnostic(
        code(hconnect::no_client),
        help(
            "Add client_id and client_secret under [oauth] in {path},\n\
             or store the secret with: hconnect auth set-secret"
        )
    )]
    NoClient { path: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(hconnect::not_found),
        help("Run: hconnect {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No appliance has entity '{entity_id}'; nothing was sent")]
    #[diagnostic(
        code(hconnect::unresolved),
        help("Run: hconnect entities to see available entity ids")
    )]
    Unresolved { entity_id: String },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(hconnect::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("No accounts configured")]
    #[diagnostic(
        code(hconnect::no_accounts),
        help("Link one with: hconnect auth url, then hconnect auth login <account> --code <code>")
    )]
    NoAccounts,

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({key}): {message}")]
    #[diagnostic(code(hconnect::api_error))]
    ApiError { key: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hconnect::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(hconnect::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(hconnect::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(hconnect::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout,

    #[error("Internal error: {0}")]
    #[diagnostic(code(hconnect::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(hconnect::json), help("Check the JSON payload and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::RateLimited { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoClient { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::Unresolved { .. } | Self::NoAccounts => {
                exit_code::NOT_FOUND
            }
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } | Self::Json(_) => {
                exit_code::USAGE
            }
            Self::Config(err) => match err.as_ref() {
                ConfigError::NoToken { .. } | ConfigError::NoClientSecret => exit_code::AUTH,
                ConfigError::UnknownAccount { .. } => exit_code::NOT_FOUND,
                _ => exit_code::USAGE,
            },
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout => CliError::Timeout,

            CoreError::RateLimited { retry_after_secs } => CliError::RateLimited { retry_after_secs },

            CoreError::AccountNotFound { id } => CliError::NotFound {
                resource_type: "account".into(),
                identifier: id,
                list_command: "accounts list".into(),
            },

            CoreError::AccountExists { id } => CliError::Conflict {
                resource_type: "account".into(),
                identifier: id,
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, key, .. } => CliError::ApiError {
                key: key.unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::Platform { category, message } => {
                CliError::Internal(format!("platform {category}: {message}"))
            }

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
