//! Redis-backed hot-set and snapshot cache.
//!
//! Subscriber interest is kept in one sorted set keyed by symbol with the
//! subscriber count as score, so reading the hot set is a ranked top-N
//! rather than a keyspace scan. Metrics snapshots live under a separate
//! `snapshot:<SYMBOL>` namespace with a TTL.
//!
//! The cache is an optional collaborator: connection failure at startup or
//! at use degrades the caller to its fallback, never aborts.

use redis::{Commands, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use ticker_common::error::CacheError;
use ticker_common::types::RollingMetrics;

const HOT_SET_KEY: &str = "subs";
const SNAPSHOT_PREFIX: &str = "snapshot:";

pub struct HotSetCache {
    connection: Mutex<Connection>,
    snapshot_ttl_secs: u64,
}

impl HotSetCache {
    /// Open a connection and verify it with a ping.
    pub fn connect(url: &str, snapshot_ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Connection(format!("invalid redis url: {}", e)))?;

        let mut connection = client
            .get_connection()
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        redis::cmd("PING")
            .query::<String>(&mut connection)
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        debug!("connected to redis at {}", url);

        Ok(Self {
            connection: Mutex::new(connection),
            snapshot_ttl_secs,
        })
    }

    /// Bump a symbol's subscriber count.
    pub async fn increment_subscriber_count(&self, symbol: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.lock().await;
        let _: i64 = connection
            .zincr(HOT_SET_KEY, symbol, 1)
            .map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(())
    }

    /// Drop a symbol's subscriber count; symbols at zero leave the set.
    pub async fn decrement_subscriber_count(&self, symbol: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.lock().await;
        let score: i64 = connection
            .zincr(HOT_SET_KEY, symbol, -1)
            .map_err(|e| CacheError::Write(e.to_string()))?;
        if score <= 0 {
            let _: i64 = connection
                .zrem(HOT_SET_KEY, symbol)
                .map_err(|e| CacheError::Write(e.to_string()))?;
        }
        Ok(())
    }

    /// The `limit` most-subscribed symbols, highest count first.
    pub async fn hot_symbols(&self, limit: isize) -> Result<Vec<String>, CacheError> {
        let mut connection = self.connection.lock().await;
        let symbols: Vec<String> = connection
            .zrevrange(HOT_SET_KEY, 0, limit.max(1) - 1)
            .map_err(|e| CacheError::Read(e.to_string()))?;
        Ok(symbols)
    }

    /// Store the latest metrics snapshot for a symbol with the configured
    /// TTL.
    pub async fn set_snapshot(&self, metrics: &RollingMetrics) -> Result<(), CacheError> {
        let payload = serde_json::to_string(metrics)?;
        let mut connection = self.connection.lock().await;
        redis::cmd("SETEX")
            .arg(format!("{}{}", SNAPSHOT_PREFIX, metrics.symbol))
            .arg(self.snapshot_ttl_secs)
            .arg(payload)
            .query::<()>(&mut connection)
            .map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(())
    }

    /// Fetch the serialized snapshot for a symbol, if one is live.
    pub async fn snapshot(&self, symbol: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.lock().await;
        let value: Option<String> = connection
            .get(format!("{}{}", SNAPSHOT_PREFIX, symbol))
            .map_err(|e| CacheError::Read(e.to_string()))?;
        Ok(value)
    }
}
