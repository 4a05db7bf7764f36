// ── Router abstraction ──
//
// Lifecycle management for one router connection: bootstrap login,
// the periodic poll task, reads of the published roster, and the few
// write operations the router exposes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use vaultlink_api::RouterClient;

use crate::cache::SnapshotCache;
use crate::config::RouterConfig;
use crate::error::{CacheError, CoreError};
use crate::model::{RosterPayload, RosterSnapshot, SnapshotSource};
use crate::poller::{ConnectionState, RosterPoller, SkipReason, TickOutcome};
use crate::stream::RosterStream;

// ── RouterStatus ─────────────────────────────────────────────────

/// Point-in-time summary of the connection and the roster.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub connected: bool,
    #[serde(skip)]
    pub state: ConnectionState,
    pub url: Url,
    pub username: String,
    pub device_count: usize,
    pub online_count: usize,
    /// Capture time of the last live roster, if the current one is live.
    pub last_update: Option<DateTime<Utc>>,
}

// ── Router ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<RouterInner>`.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    config: RouterConfig,
    poller: Arc<RosterPoller>,
    cache: Arc<dyn SnapshotCache>,
    cancel: CancellationToken,
    /// Child token for the current connection. Cancelled on disconnect,
    /// replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Router {
    /// Create a router handle. Does NOT connect; call
    /// [`connect()`](Self::connect) to log in and start polling.
    pub fn new(config: RouterConfig, cache: Arc<dyn SnapshotCache>) -> Result<Self, CoreError> {
        let client = RouterClient::new(
            config.url.clone(),
            config.username.clone(),
            &config.transport(),
        )?;
        let poller = Arc::new(RosterPoller::new(
            Arc::new(client),
            config.password.clone(),
            Arc::clone(&cache),
            config.cache_key.clone(),
            config.cache_ttl,
        ));
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(RouterInner {
                config,
                poller,
                cache,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    pub fn poller(&self) -> &Arc<RosterPoller> {
        &self.inner.poller
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, publish an initial roster, and spawn the poll task.
    ///
    /// A failed login is returned and nothing is spawned. A failed initial
    /// tick is not: the poll task keeps retrying.
    ///
    /// Calling this on a connected router stops the running poll task
    /// first, so at most one task ever polls.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.stop_polling().await;
        self.bootstrap().await?;

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let poller = Arc::clone(&self.inner.poller);
        let period = self.inner.config.poll_interval;
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(poll_task(poller, period, child)));

        info!(url = %self.inner.config.url, "router connected");
        Ok(())
    }

    /// Stop polling, log out, and publish the empty snapshot.
    pub async fn disconnect(&self) {
        self.stop_polling().await;

        if let Err(e) = self.inner.poller.client().logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
        self.inner.poller.shutdown();
        debug!("disconnected");
    }

    /// Connect without a poll task, run `f`, then disconnect.
    ///
    /// For one-shot CLI invocations that need a single fresh roster.
    pub async fn oneshot<F, Fut, T>(
        config: RouterConfig,
        cache: Arc<dyn SnapshotCache>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Router) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let router = Router::new(config, cache)?;
        router.bootstrap().await?;
        let result = f(router.clone()).await;
        router.disconnect().await;
        result
    }

    /// Run one poll cycle now, through the same single-flight guard as
    /// the background task.
    pub async fn refresh_now(&self) -> TickOutcome {
        self.inner.poller.tick().await
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.poller.subscribe_state()
    }

    /// The last published in-process roster. Never touches the network.
    pub fn current_roster(&self) -> Arc<RosterSnapshot> {
        self.inner.poller.snapshot()
    }

    /// Cache-first read: the cached roster if one is present and readable,
    /// otherwise the in-process snapshot.
    pub async fn cached_roster(&self) -> Arc<RosterSnapshot> {
        match self.read_cache().await {
            Ok(Some(snapshot)) => return Arc::new(snapshot),
            Ok(None) => debug!("no cached roster, using in-process snapshot"),
            Err(e) => warn!(error = %e, "cached roster unusable, using in-process snapshot"),
        }
        self.current_roster()
    }

    /// Subscribe to roster publishes.
    pub fn subscribe_roster(&self) -> RosterStream {
        RosterStream::new(self.inner.poller.subscribe())
    }

    pub fn status(&self) -> RouterStatus {
        let state = self.inner.poller.connection_state();
        let roster = self.current_roster();
        RouterStatus {
            connected: state == ConnectionState::Connected,
            state,
            url: self.inner.config.url.clone(),
            username: self.inner.config.username.clone(),
            device_count: roster.len(),
            online_count: roster.online_count(),
            last_update: (roster.source == SnapshotSource::Live).then_some(roster.captured_at),
        }
    }

    /// Whether `mac` appears in the current in-process roster.
    pub fn is_device_active(&self, mac: &str) -> bool {
        self.current_roster().contains_mac(mac)
    }

    // ── Router operations ────────────────────────────────────────

    /// Store a display alias for `mac` on the router.
    pub async fn set_client_alias(&self, mac: &str, alias: &str) -> Result<(), CoreError> {
        self.inner
            .poller
            .client()
            .set_client_alias(mac, alias)
            .await?;
        Ok(())
    }

    pub async fn system_status(&self) -> Result<Value, CoreError> {
        Ok(self.inner.poller.client().system_status().await?)
    }

    // ── Private helpers ──────────────────────────────────────────

    /// Cancel the current poll task and wait for every spawned task.
    async fn stop_polling(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }

    async fn read_cache(&self) -> Result<Option<RosterSnapshot>, CacheError> {
        let Some(text) = self.inner.cache.get(&self.inner.config.cache_key).await? else {
            return Ok(None);
        };
        let payload: RosterPayload = serde_json::from_str(&text)?;
        Ok(Some(payload.into_snapshot()))
    }

    async fn bootstrap(&self) -> Result<(), CoreError> {
        self.inner.poller.bootstrap().await?;
        debug!("session authentication successful");

        match self.inner.poller.tick().await {
            TickOutcome::Published { devices } => debug!(devices, "initial roster published"),
            TickOutcome::Failed { stage } => warn!(%stage, "initial roster fetch failed"),
            TickOutcome::Skipped(reason) => debug!(?reason, "initial tick skipped"),
        }
        Ok(())
    }
}

/// Tick the poller at a fixed period until cancelled.
async fn poll_task(poller: Arc<RosterPoller>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let TickOutcome::Skipped(SkipReason::Busy) = poller.tick().await {
                    debug!("tick overlapped a manual refresh");
                }
            }
        }
    }
}
