//! Shared configuration for vaultlink.
//!
//! Profiles live in a TOML file under the platform config directory and can
//! be overridden with `VAULTLINK_` environment variables (nested keys are
//! separated by `__`, e.g. `VAULTLINK_PROFILES__HOME__ROUTER_URL`).
//! [`profile_to_router_config`] resolves credentials and validates polling
//! settings, producing the [`RouterConfig`] that `vaultlink-core` consumes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use vaultlink_core::config::{
    DEFAULT_CACHE_KEY, DEFAULT_CACHE_TTL, DEFAULT_POLL_INTERVAL, DEFAULT_ROUTER_URL,
    DEFAULT_TIMEOUT, DEFAULT_USERNAME,
};
use vaultlink_core::{RouterConfig, TlsVerification};

/// Keyring service name; entries are keyed `{profile}/password`.
pub const KEYRING_SERVICE: &str = "vaultlink";

/// Fallback password variable, consulted after a profile's `password_env`.
pub const PASSWORD_ENV: &str = "VAULTLINK_PASSWORD";

/// Profile used when neither the caller nor the file names one.
pub const DEFAULT_PROFILE: &str = "default";

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    Serialization(#[from] toml::ser::Error),

    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Settings shared by every profile unless the profile overrides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub output: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_key: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: "table".into(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            poll_interval_ms: millis(DEFAULT_POLL_INTERVAL),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            cache_key: DEFAULT_CACHE_KEY.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_router_url")]
    pub router_url: String,
    #[serde(default = "default_username")]
    pub username: String,
    /// Name of an environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    /// Plaintext password. Prefer `password_env` or the keyring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    /// `redis://` URL of the external roster cache. Unset keeps the
    /// roster in-process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_url: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            router_url: default_router_url(),
            username: default_username(),
            password_env: None,
            password: None,
            insecure: None,
            ca_cert: None,
            timeout_secs: None,
            poll_interval_ms: None,
            cache_ttl_secs: None,
            cache_key: None,
            cache_url: None,
        }
    }
}

fn default_router_url() -> String {
    DEFAULT_ROUTER_URL.into()
}

fn default_username() -> String {
    DEFAULT_USERNAME.into()
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Look up the profile to use: `requested`, else `default_profile`,
    /// else `"default"`.
    ///
    /// An unconfigured `"default"` profile resolves to stock settings so
    /// the tool works against a factory router with only an env password.
    pub fn active_profile(
        &self,
        requested: Option<&str>,
    ) -> Result<(String, Profile), ConfigError> {
        let name = requested
            .or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE);

        if let Some(profile) = self.profiles.get(name) {
            return Ok((name.to_owned(), profile.clone()));
        }
        if name == DEFAULT_PROFILE {
            return Ok((name.to_owned(), Profile::default()));
        }

        let mut available: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        Err(ConfigError::ProfileNotFound {
            name: name.to_owned(),
            available: if available.is_empty() {
                "none".into()
            } else {
                available.join(", ")
            },
        })
    }
}

// ── Loading & saving ────────────────────────────────────────────────

/// Canonical config file path.
pub fn config_path() -> PathBuf {
    directories::ProjectDirs::from("com", "vaultlink", "vaultlink").map_or_else(
        || PathBuf::from("vaultlink.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Load from the canonical path: defaults, then TOML, then env.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit path. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VAULTLINK_").split("__"))
        .extract()?;
    Ok(config)
}

/// Write `cfg` as TOML, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a profile's password.
///
/// Order: the profile's `password_env` variable, [`PASSWORD_ENV`], the
/// system keyring, then the plaintext `password` field.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        |var| std::env::var(var).ok(),
        keyring_password,
    )
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    let from_env = profile
        .password_env
        .as_deref()
        .and_then(&env)
        .or_else(|| env(PASSWORD_ENV));

    from_env
        .or_else(|| keyring(profile_name))
        .or_else(|| profile.password.clone())
        .filter(|pw| !pw.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.to_owned(),
        })
}

// ── Translation to RouterConfig ─────────────────────────────────────

/// Build a validated [`RouterConfig`] from a profile and the shared defaults.
pub fn profile_to_router_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<RouterConfig, ConfigError> {
    let url: url::Url = profile
        .router_url
        .parse()
        .map_err(|e: url::ParseError| ConfigError::Validation {
            field: "router_url".into(),
            reason: e.to_string(),
        })?;

    let password = resolve_password(profile, profile_name)?;
    let mut config = RouterConfig::new(url, profile.username.clone(), password);
    apply_profile_settings(&mut config, profile, defaults)?;
    Ok(config)
}

fn apply_profile_settings(
    config: &mut RouterConfig,
    profile: &Profile,
    defaults: &Defaults,
) -> Result<(), ConfigError> {
    config.tls = tls_for(profile);

    let timeout_secs = profile.timeout_secs.unwrap_or(defaults.timeout_secs);
    let poll_ms = profile.poll_interval_ms.unwrap_or(defaults.poll_interval_ms);
    let ttl_secs = profile.cache_ttl_secs.unwrap_or(defaults.cache_ttl_secs);

    if timeout_secs == 0 {
        return Err(invalid("timeout_secs", "must be greater than zero"));
    }
    if poll_ms == 0 {
        return Err(invalid("poll_interval_ms", "must be greater than zero"));
    }
    let poll_interval = Duration::from_millis(poll_ms);
    let cache_ttl = Duration::from_secs(ttl_secs);
    if cache_ttl <= poll_interval {
        return Err(invalid(
            "cache_ttl_secs",
            "must be longer than the poll interval",
        ));
    }

    let cache_key = profile
        .cache_key
        .clone()
        .unwrap_or_else(|| defaults.cache_key.clone());
    if cache_key.is_empty() {
        return Err(invalid("cache_key", "must not be empty"));
    }

    if let Some(ref cache_url) = profile.cache_url {
        let parsed: url::Url = cache_url
            .parse()
            .map_err(|e: url::ParseError| invalid("cache_url", &e.to_string()))?;
        if parsed.scheme() != "redis" {
            return Err(invalid("cache_url", "must be a redis:// URL"));
        }
    }

    config.timeout = Duration::from_secs(timeout_secs);
    config.poll_interval = poll_interval;
    config.cache_ttl = cache_ttl;
    config.cache_key = cache_key;
    config.cache_url.clone_from(&profile.cache_url);
    Ok(())
}

fn tls_for(profile: &Profile) -> TlsVerification {
    if let Some(ref ca) = profile.ca_cert {
        TlsVerification::CustomCa(ca.clone())
    } else if profile.insecure == Some(false) {
        TlsVerification::SystemDefaults
    } else {
        TlsVerification::DangerAcceptInvalid
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}
