//! `alias`: store a display alias for a client on the router.

use std::sync::Arc;

use vaultlink_core::{MacAddress, MemoryCache, Router, RouterConfig};

use crate::cli::{AliasArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: AliasArgs,
    config: RouterConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mac = MacAddress::new(&args.mac);
    if mac.is_empty() {
        return Err(CliError::Validation {
            field: "mac".into(),
            reason: "must not be empty".into(),
        });
    }

    let alias = args.alias;
    let target = mac.clone();
    let label = alias.clone();
    Router::oneshot(config, Arc::new(MemoryCache::new()), |router| async move {
        router.set_client_alias(target.as_str(), &label).await
    })
    .await?;

    output::print_output(&format!("Alias for {mac} set to '{alias}'"), global.quiet);
    Ok(())
}
