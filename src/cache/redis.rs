use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::Cache;
use crate::error::CacheError;

/// Redis-backed cache over a single multiplexed connection. The connection
/// is cheap to clone; every command clones it so the cache itself needs no
/// mutable state.
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connects eagerly so a misconfigured Redis fails at startup rather
    /// than on the first order.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!("✅ Connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            conn.set::<_, _, ()>(key, value).await
        } else {
            // SETEX rejects a zero expiry, so round sub-second TTLs up.
            conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
        }
        .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(key)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;
        Ok(removed > 0)
    }
}
