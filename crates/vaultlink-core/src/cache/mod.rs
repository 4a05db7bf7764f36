// ── External snapshot cache ──
//
// The poller publishes every live roster to a key/value store with an
// expiry so out-of-process readers keep seeing recent data through a
// short router outage.

mod memory;
mod remote;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub use memory::MemoryCache;
pub use remote::RedisCache;

/// Key/value store with per-entry expiry, in the shape of Redis `SET .. EX`
/// and `GET`.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry. The entry
    /// disappears once `ttl` has elapsed.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Read `key`. Expired and missing entries are both `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
}
