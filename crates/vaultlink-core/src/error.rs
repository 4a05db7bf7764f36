// ── Core error types ──
//
// User-facing errors from vaultlink-core. Consumers never see raw HTTP
// status codes or JSON envelopes; `From<vaultlink_api::Error>` translates
// transport-layer failures into domain variants.

use thiserror::Error;

/// Failure of the external snapshot cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cache URL: {0}")]
    InvalidUrl(String),

    #[error("Cached roster is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to router at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Router not connected")]
    NotConnected,

    #[error("Router request timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Request rejected by router: {message}")]
    Rejected { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vaultlink_api::Error> for CoreError {
    fn from(err: vaultlink_api::Error) -> Self {
        use vaultlink_api::Error as Api;

        match err {
            Api::MissingPassword
            | Api::UnsupportedAlgorithm { .. }
            | Api::Authentication { .. } => CoreError::AuthenticationFailed {
                message: err.to_string(),
            },
            Api::NotAuthenticated => CoreError::NotConnected,
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::Http { status, reason } => CoreError::Api {
                message: format!("HTTP {status}: {reason}"),
                status: Some(status),
            },
            Api::Rpc { payload } => CoreError::Rejected {
                message: payload
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| payload.to_string(), str::to_owned),
            },
            Api::Deserialization { message, .. } => CoreError::Api {
                message,
                status: None,
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid router URL: {e}"),
            },
            Api::Tls(message) => CoreError::Config { message },
        }
    }
}
