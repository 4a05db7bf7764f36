// ── Runtime connection configuration ──
//
// Describes how to reach one router and how to poll it. Carries the
// credential but never touches disk; the CLI builds a `RouterConfig`
// and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use vaultlink_api::transport::{TlsMode, TransportConfig};

pub const DEFAULT_ROUTER_URL: &str = "http://192.168.8.1/rpc";
pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);
pub const DEFAULT_CACHE_KEY: &str = "router_clients:";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Routers ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one router connection.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Full JSON-RPC endpoint (e.g., `http://192.168.8.1/rpc`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout. Bounds how long one tick can hold the poller.
    pub timeout: Duration,
    /// Period between poll ticks.
    pub poll_interval: Duration,
    /// Expiry of each cache write.
    pub cache_ttl: Duration,
    /// Cache key the roster is written under.
    pub cache_key: String,
    /// Redis URL of the external cache. `None` keeps the roster in-process.
    pub cache_url: Option<String>,
}

impl RouterConfig {
    /// Config with the stock polling defaults.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_key: DEFAULT_CACHE_KEY.to_owned(),
            cache_url: None,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
