// Redis-backed snapshot cache: `SET key value EX ttl` and `GET key`.
//
// One multiplexed connection is opened on first use and shared by every
// call. A connection-level failure drops it so the next call reconnects.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, RedisResult};
use tokio::sync::Mutex;
use tracing::debug;

use super::SnapshotCache;
use crate::error::CacheError;

pub struct RedisCache {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisCache {
    /// Parse `url` (`redis://[user:password@]host[:port][/db]`). Does not
    /// connect.
    pub fn open(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut slot = self.connection.lock().await;
        if let Some(ref conn) = *slot {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        debug!("redis connection established");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn settle<T>(&self, result: RedisResult<T>) -> Result<T, CacheError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    self.connection.lock().await.take();
                }
                Err(unavailable(e))
            }
        }
    }
}

#[async_trait]
impl SnapshotCache for RedisCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let result: RedisResult<()> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(expiry_secs(ttl))
            .query_async(&mut conn)
            .await;
        self.settle(result).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let result: RedisResult<Option<String>> =
            redis::cmd("GET").arg(key).query_async(&mut conn).await;
        self.settle(result).await
    }
}

fn unavailable(err: RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

/// `EX` takes whole seconds; round up so an entry never expires early.
fn expiry_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
