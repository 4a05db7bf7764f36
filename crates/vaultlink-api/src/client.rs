// Router JSON-RPC client
//
// Wraps `reqwest::Client` with envelope construction, session id injection,
// and response unwrapping. The login handshake and the typed endpoints
// (clients, system) are implemented as inherent methods in separate files
// to keep this module focused on transport mechanics.

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::rpc::{Params, RpcRequest, RpcResponse, is_bootstrap_method};
use crate::session::{AuthState, Session};
use crate::transport::TransportConfig;

/// HTTP client for a router's JSON-RPC management endpoint.
///
/// Strictly request/response: one POST per call, no pipelining. Holds the
/// session (id + request counter) that every call reads at send time.
pub struct RouterClient {
    http: reqwest::Client,
    url: Url,
    username: String,
    pub(crate) session: Session,
}

impl RouterClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `url` is the full RPC endpoint (e.g. `http://192.168.8.1/rpc`).
    pub fn new(
        url: Url,
        username: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, url, username))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, url: Url, username: impl Into<String>) -> Self {
        Self {
            http,
            url,
            username: username.into(),
            session: Session::default(),
        }
    }

    /// The RPC endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The account this client logs in as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Current session id, if logged in.
    pub fn session_id(&self) -> Option<String> {
        self.session.sid()
    }

    pub fn auth_state(&self) -> AuthState {
        self.session.state()
    }

    /// The request id the next call will carry.
    pub fn next_request_id(&self) -> u64 {
        self.session.peek_id()
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send one RPC call and unwrap the response envelope.
    ///
    /// The session id is injected into `params` for every method except
    /// `challenge` and `login`. The request counter advances whether or not
    /// the call succeeds.
    pub async fn request(&self, method: &str, params: Params) -> Result<Value, Error> {
        let params = match self.session.sid() {
            Some(sid) if !is_bootstrap_method(method) => params.with_session(&sid),
            _ => params,
        };

        let id = self.session.next_id();
        let envelope = RpcRequest::new(id, method, params);
        debug!(id, method, "rpc request");

        let resp = self
            .http
            .post(self.url.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(Error::Transport)?;

        self.parse_envelope(id, resp).await
    }

    async fn parse_envelope(&self, id: u64, resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_owned(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(id, len = body.len(), "rpc response");

        let envelope: RpcResponse = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        envelope.into_result()
    }
}
