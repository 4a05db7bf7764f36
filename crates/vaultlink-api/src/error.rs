use thiserror::Error;

/// Top-level error type for the `vaultlink-api` crate.
///
/// Covers every failure mode of the router client: the login handshake,
/// the HTTP transport, and the JSON-RPC envelope. `vaultlink-core` maps
/// these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// `login` was called with an empty password.
    #[error("Password is required")]
    MissingPassword,

    /// The challenge announced a crypt algorithm we do not implement.
    #[error("Unsupported hash algorithm: {alg}")]
    UnsupportedAlgorithm { alg: String },

    /// The handshake completed at the transport level but did not yield
    /// a usable session.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An authenticated operation was invoked without a session.
    #[error("Not logged in -- call login() first")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The router answered with a non-success HTTP status.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// The response envelope carried an explicit `error` field.
    #[error("API error: {payload}")]
    Rpc { payload: serde_json::Value },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Coarse classification of an [`Error`], for callers that only need to
/// decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty password, unsupported algorithm, unusable login result.
    Auth,
    /// Network failure or non-success HTTP status.
    Transport,
    /// Error payload or malformed body from the router.
    Protocol,
    /// No session held.
    NotAuthenticated,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPassword
            | Self::UnsupportedAlgorithm { .. }
            | Self::Authentication { .. } => ErrorKind::Auth,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::Transport(_) | Self::Http { .. } | Self::InvalidUrl(_) | Self::Tls(_) => {
                ErrorKind::Transport
            }
            Self::Rpc { .. } | Self::Deserialization { .. } => ErrorKind::Protocol,
        }
    }

    /// Returns `true` if the router rejected the session itself (as
    /// opposed to being unreachable).
    pub fn is_session_rejected(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }

    /// Extract the router-supplied error payload, if any.
    pub fn rpc_payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Rpc { payload } => Some(payload),
            _ => None,
        }
    }
}
