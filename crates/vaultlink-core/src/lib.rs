//! Roster synchronization between `vaultlink-api` and its consumers.
//!
//! - **[`Router`]**: Facade managing the connection lifecycle:
//!   [`connect()`](Router::connect) logs in, publishes an initial roster,
//!   then spawns the periodic poll task. [`Router::oneshot()`] skips the
//!   background task for single CLI invocations.
//!
//! - **[`RosterPoller`]**: One single-flight poll cycle per tick: liveness
//!   probe, re-login, fetch, normalize, publish, cache. Failures demote the
//!   [`ConnectionState`] and publish an empty snapshot; the cache entry is
//!   left to expire.
//!
//! - **[`SnapshotCache`]**: Key/value store with per-entry TTL that the
//!   poller writes every live roster to. [`RedisCache`] shares it with
//!   out-of-process readers; [`MemoryCache`] keeps it in-process.
//!
//! - **[`RosterStream`]**: Subscription handle over published snapshots.
//!
//! - **Domain model** ([`model`]): [`DeviceRecord`], [`RosterSnapshot`],
//!   and [`MacAddress`].

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod poller;
pub mod router;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{MemoryCache, RedisCache, SnapshotCache};
pub use config::{RouterConfig, TlsVerification};
pub use error::{CacheError, CoreError};
pub use poller::{ConnectionState, PollStage, RosterPoller, SkipReason, TickOutcome};
pub use router::{Router, RouterStatus};
pub use stream::{RosterStream, RosterWatchStream};

pub use model::{
    DeviceRecord, LinkKind, MacAddress, RosterPayload, RosterSnapshot, SnapshotSource,
    format_bytes,
};
