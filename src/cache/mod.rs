use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

mod memory;
mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

// ============================================================================
// Cache Abstraction
// ============================================================================
//
// Read-through cache for serialized order aggregates, keyed by order_uid.
// The service layer treats every implementation as best-effort: a failed
// cache call is logged and the store remains the source of truth.
//
// ============================================================================

#[async_trait]
pub trait Cache: Send + Sync {
    /// Stores a value under `key`. A zero `ttl` means no expiry.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Fetches the value for `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Removes `key`, reporting whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}
