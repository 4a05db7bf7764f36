//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use vaultlink_config::ConfigError;
use vaultlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const UNAVAILABLE: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to router at {url}: {reason}")]
    #[diagnostic(
        code(vaultlink::connection_failed),
        help(
            "Check that the router is reachable and the RPC endpoint is correct.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Router connection is not established")]
    #[diagnostic(code(vaultlink::not_connected))]
    NotConnected,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(vaultlink::auth_failed),
        help(
            "Verify the username and password for profile '{profile}'.\n\
             The router only accepts crypt algorithm id \"1\"."
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(vaultlink::no_credentials),
        help(
            "Set VAULTLINK_PASSWORD, point password_env at a variable holding it,\n\
             or store it in the system keyring under vaultlink/{profile}/password."
        )
    )]
    NoCredentials { profile: String },

    #[error("Unsupported crypt algorithm id '{alg}'")]
    #[diagnostic(
        code(vaultlink::unsupported_algorithm),
        help("Only id \"1\" (MD5-crypt) is supported.")
    )]
    UnsupportedAlgorithm { alg: String },

    // ── Router ───────────────────────────────────────────────────────

    #[error("Router rejected the request: {message}")]
    #[diagnostic(code(vaultlink::rejected))]
    Rejected { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(vaultlink::api_error))]
    ApiError { message: String },

    #[error("Roster unavailable: the router did not return a client list")]
    #[diagnostic(
        code(vaultlink::roster_unavailable),
        help("Re-run with -v to see why the fetch failed.")
    )]
    RosterUnavailable,

    #[error("Cache error: {message}")]
    #[diagnostic(code(vaultlink::cache))]
    Cache { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vaultlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vaultlink::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(vaultlink::config),
        help("Check the file reported by: vaultlink config path")
    )]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out")]
    #[diagnostic(
        code(vaultlink::timeout),
        help("Increase the timeout with --timeout or check router responsiveness.")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Output serialization failed: {0}")]
    #[diagnostic(code(vaultlink::serialize))]
    Serialize(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected => exit_code::CONNECTION,
            Self::AuthFailed { .. }
            | Self::NoCredentials { .. }
            | Self::UnsupportedAlgorithm { .. } => exit_code::AUTH,
            Self::RosterUnavailable | Self::Cache { .. } => exit_code::UNAVAILABLE,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::Config { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Attribute an authentication failure to the profile in use.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.to_owned(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::NotConnected => CliError::NotConnected,
            CoreError::Timeout => CliError::Timeout,
            CoreError::Rejected { message } => CliError::Rejected { message },
            CoreError::Api { message, .. } => CliError::ApiError { message },
            CoreError::Cache(e) => CliError::Cache {
                message: e.to_string(),
            },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

// ── Hash command errors ──────────────────────────────────────────────

impl From<vaultlink_api::Error> for CliError {
    fn from(err: vaultlink_api::Error) -> Self {
        match err {
            vaultlink_api::Error::UnsupportedAlgorithm { alg } => {
                CliError::UnsupportedAlgorithm { alg }
            }
            other => CoreError::from(other).into(),
        }
    }
}
