//! `run`: keep the roster cache fresh until interrupted.

use std::sync::Arc;

use tracing::{debug, info, warn};

use vaultlink_core::{MemoryCache, RedisCache, Router, RouterConfig, SnapshotCache, SnapshotSource};

use crate::error::CliError;

pub async fn handle(config: RouterConfig) -> Result<(), CliError> {
    let (cache, memory) = open_cache(&config)?;
    let purge_period = config.cache_ttl;
    let url = config.url.clone();

    let router = Router::new(config, cache)?;
    router.connect().await?;
    info!(%url, "polling router, press Ctrl-C to stop");

    let mut roster = router.subscribe_roster();
    let mut state = router.connection_state();
    let mut purge = tokio::time::interval(purge_period);

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                info!("shutting down");
                break;
            }
            Some(snapshot) = roster.changed() => match snapshot.source {
                SnapshotSource::Stale => warn!("roster unavailable, published empty snapshot"),
                _ => debug!(
                    devices = snapshot.len(),
                    online = snapshot.online_count(),
                    "roster published"
                ),
            },
            Ok(()) = state.changed() => {
                let current = *state.borrow_and_update();
                info!(state = ?current, "connection state changed");
            }
            _ = purge.tick(), if memory.is_some() => {
                let purged = memory.as_ref().map_or(0, |m| m.purge_expired());
                if purged > 0 {
                    debug!(purged, "expired cache entries purged");
                }
            }
        }
    }

    router.disconnect().await;
    Ok(())
}

/// Redis when the profile names a `cache_url`, otherwise an in-process
/// cache that this loop purges itself.
fn open_cache(
    config: &RouterConfig,
) -> Result<(Arc<dyn SnapshotCache>, Option<Arc<MemoryCache>>), CliError> {
    match config.cache_url.as_deref() {
        Some(url) => {
            let redis = RedisCache::open(url).map_err(|e| CliError::Validation {
                field: "cache_url".into(),
                reason: e.to_string(),
            })?;
            info!("writing roster to redis");
            Ok((Arc::new(redis), None))
        }
        None => {
            let memory = Arc::new(MemoryCache::new());
            Ok((Arc::clone(&memory) as Arc<dyn SnapshotCache>, Some(memory)))
        }
    }
}
