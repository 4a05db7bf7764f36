// ── Roster poller ──
//
// One tick: probe the session, log in again if it is gone, fetch the
// roster, normalize it, publish it in-process, then write it to the
// external cache. Failures never escape a tick. They demote the
// connection state and publish the fail-closed empty snapshot, while the
// cache entry is left to expire on its own TTL.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use vaultlink_api::RouterClient;

use crate::cache::SnapshotCache;
use crate::convert::normalize_roster;
use crate::error::CacheError;
use crate::model::{RosterSnapshot, SnapshotSource};

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The last `attempt` ticks failed; the next tick retries.
    Reconnecting { attempt: u32 },
    /// The bootstrap login failed. Nothing polls until `connect` is retried.
    Failed,
}

// ── Tick results ─────────────────────────────────────────────────

/// Step of a tick that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStage {
    Login,
    Fetch,
    Encode,
    Cache,
}

impl fmt::Display for PollStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Login => "login",
            Self::Fetch => "fetch",
            Self::Encode => "encode",
            Self::Cache => "cache",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The previous tick is still running.
    Busy,
    /// No initial login has succeeded yet.
    NotBootstrapped,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A fresh roster was published and cached.
    Published { devices: usize },
    Skipped(SkipReason),
    Failed { stage: PollStage },
}

/// Internal failure of one poll cycle. Logged, never returned to callers.
#[derive(Debug, Error)]
enum PollError {
    #[error("re-authentication failed: {0}")]
    Login(#[source] vaultlink_api::Error),
    #[error("roster fetch failed: {0}")]
    Fetch(#[source] vaultlink_api::Error),
    #[error("roster encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("cache write failed: {0}")]
    Cache(#[source] CacheError),
}

impl PollError {
    fn stage(&self) -> PollStage {
        match self {
            Self::Login(_) => PollStage::Login,
            Self::Fetch(_) => PollStage::Fetch,
            Self::Encode(_) => PollStage::Encode,
            Self::Cache(_) => PollStage::Cache,
        }
    }
}

// ── Single-flight guard ──────────────────────────────────────────

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── RosterPoller ─────────────────────────────────────────────────

/// Keeps the roster snapshot fresh for one router session.
///
/// Ticks are single-flight: a tick that starts while another is running
/// returns [`SkipReason::Busy`] without touching the network.
pub struct RosterPoller {
    client: Arc<RouterClient>,
    password: SecretString,
    cache: Arc<dyn SnapshotCache>,
    cache_key: String,
    cache_ttl: Duration,
    snapshot: watch::Sender<Arc<RosterSnapshot>>,
    state: watch::Sender<ConnectionState>,
    busy: AtomicBool,
    bootstrapped: AtomicBool,
}

impl RosterPoller {
    pub fn new(
        client: Arc<RouterClient>,
        password: SecretString,
        cache: Arc<dyn SnapshotCache>,
        cache_key: impl Into<String>,
        cache_ttl: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(RosterSnapshot::stale()));
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            client,
            password,
            cache,
            cache_key: cache_key.into(),
            cache_ttl,
            snapshot,
            state,
            busy: AtomicBool::new(false),
            bootstrapped: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &Arc<RouterClient> {
        &self.client
    }

    /// Initial login. Ticks are skipped until this has succeeded once.
    pub async fn bootstrap(&self) -> Result<(), vaultlink_api::Error> {
        self.state.send_replace(ConnectionState::Connecting);
        match self.client.login(&self.password).await {
            Ok(()) => {
                self.bootstrapped.store(true, Ordering::Release);
                self.state.send_replace(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Failed);
                Err(e)
            }
        }
    }

    /// Run one poll cycle.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!("previous tick still running, skipping");
            return TickOutcome::Skipped(SkipReason::Busy);
        };
        if !self.bootstrapped.load(Ordering::Acquire) {
            return TickOutcome::Skipped(SkipReason::NotBootstrapped);
        }

        match self.poll_once().await {
            Ok(devices) => {
                self.mark_connected();
                TickOutcome::Published { devices }
            }
            Err(err) => {
                let stage = err.stage();
                let attempt = self.mark_reconnecting();
                warn!(%stage, attempt, error = %err, "roster poll failed");
                self.publish_stale();
                TickOutcome::Failed { stage }
            }
        }
    }

    /// Stop polling: forget the bootstrap and publish the empty snapshot.
    pub fn shutdown(&self) {
        self.bootstrapped.store(false, Ordering::Release);
        self.publish_stale();
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<RosterSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RosterSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn poll_once(&self) -> Result<usize, PollError> {
        if !self.client.is_alive().await {
            info!("router session lost, logging in again");
            self.client
                .login(&self.password)
                .await
                .map_err(PollError::Login)?;
        }

        let raw = self.client.list_clients().await.map_err(PollError::Fetch)?;
        let snapshot = Arc::new(RosterSnapshot::live(normalize_roster(&raw)));
        let devices = snapshot.len();
        self.snapshot.send_replace(Arc::clone(&snapshot));

        let payload = serde_json::to_string(&snapshot.to_payload()).map_err(PollError::Encode)?;
        self.cache
            .set(&self.cache_key, payload, self.cache_ttl)
            .await
            .map_err(PollError::Cache)?;

        debug!(devices, "roster published");
        Ok(devices)
    }

    fn mark_connected(&self) {
        let previous = self.state.send_replace(ConnectionState::Connected);
        if matches!(previous, ConnectionState::Reconnecting { .. }) {
            info!("router connection restored");
        }
    }

    fn mark_reconnecting(&self) -> u32 {
        let attempt = match *self.state.borrow() {
            ConnectionState::Reconnecting { attempt } => attempt.saturating_add(1),
            _ => 1,
        };
        self.state.send_replace(ConnectionState::Reconnecting { attempt });
        attempt
    }

    fn publish_stale(&self) {
        self.snapshot.send_if_modified(|current| {
            if current.source == SnapshotSource::Stale && current.is_empty() {
                false
            } else {
                *current = Arc::new(RosterSnapshot::stale());
                true
            }
        });
    }
}
