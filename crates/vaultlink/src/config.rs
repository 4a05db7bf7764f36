//! CLI configuration: a thin wrapper around `vaultlink_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--router, --username, --insecure, --timeout).

use vaultlink_core::RouterConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use vaultlink_config::{Config, config_path, load_config};

/// A router configuration together with the profile it came from.
pub struct Resolved {
    pub profile: String,
    pub router: RouterConfig,
}

/// Translate the active profile plus global flags into a `RouterConfig`.
///
/// Flag values take priority over profile values.
pub fn resolve(
    global: &GlobalOpts,
    cfg: &Config,
    poll_interval_ms: Option<u64>,
) -> Result<Resolved, CliError> {
    let (name, mut profile) = cfg.active_profile(global.profile.as_deref())?;

    if let Some(ref url) = global.router {
        profile.router_url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if global.insecure {
        profile.insecure = Some(true);
        profile.ca_cert = None;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout_secs = Some(timeout);
    }
    if let Some(ms) = poll_interval_ms {
        profile.poll_interval_ms = Some(ms);
    }

    let router = vaultlink_config::profile_to_router_config(&profile, &name, &cfg.defaults)?;
    Ok(Resolved {
        profile: name,
        router,
    })
}
