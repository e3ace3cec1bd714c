use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::domain::Order;
use crate::error::{OrderError, StoreError};
use crate::storage::OrderStore;

// ============================================================================
// Order Service - cache-aside reads, validated writes
// ============================================================================
//
// The store is the source of truth; the cache is an optimization layer.
// Every cache failure is logged and swallowed so an outage degrades reads
// to store latency instead of failing them.
// ============================================================================

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<dyn Cache>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// Validates and persists a new order, then caches it for readers.
    /// The write is atomic in the store; the cache update is best effort.
    pub async fn insert_order(&self, order: &Order) -> Result<(), OrderError> {
        order.validate()?;
        self.store.insert_order(order).await?;
        self.cache_order(order).await;
        Ok(())
    }

    /// Fetches an order, trying the cache first and reading through to the
    /// store on a miss. A hit that fails to decode is treated as a miss.
    pub async fn get_order(&self, order_uid: &str) -> Result<Order, OrderError> {
        match self.cache.get(order_uid).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Order>(&bytes) {
                Ok(order) => {
                    tracing::debug!(order_uid, "Cache hit");
                    return Ok(order);
                }
                Err(error) => {
                    tracing::warn!(order_uid, %error, "Undecodable cache entry, reading through")
                }
            },
            Ok(None) => {}
            Err(error) => tracing::warn!(order_uid, %error, "Cache read failed, reading through"),
        }

        let order = match self.store.get_order(order_uid).await {
            Ok(order) => order,
            Err(StoreError::NotFound) => return Err(OrderError::NotFound(order_uid.to_string())),
            Err(error) => return Err(error.into()),
        };

        self.cache_order(&order).await;
        Ok(order)
    }

    /// Loads every stored order into the cache. Returns how many were
    /// loaded; a store failure on any single order aborts the warm-up.
    pub async fn warm_up(&self) -> Result<usize, OrderError> {
        let uids = self.store.list_order_uids().await?;
        for uid in &uids {
            let order = self.store.get_order(uid).await?;
            self.cache_order(&order).await;
        }
        Ok(uids.len())
    }

    async fn cache_order(&self, order: &Order) {
        let bytes = match serde_json::to_vec(order) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(order_uid = %order.order_uid, %error, "Order not cacheable");
                return;
            }
        };
        if let Err(error) = self.cache.set(&order.order_uid, &bytes, self.cache_ttl).await {
            tracing::warn!(order_uid = %order.order_uid, %error, "Cache write failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::cache::MemoryCache;
    use crate::domain::test_order;
    use crate::error::CacheError;
    use crate::storage::MemoryStore;

    fn service() -> (OrderService, Arc<MemoryStore>, Arc<MemoryCache>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let service = OrderService::new(store.clone(), cache.clone(), Duration::from_secs(60));
        (service, store, cache)
    }

    /// Cache that fails every call, for degraded-mode tests.
    struct FailingCache;

    impl FailingCache {
        fn error() -> CacheError {
            CacheError::Connection("cache offline".to_string())
        }
    }

    #[async_trait]
    impl Cache for FailingCache {
        async fn set(&self, _: &str, _: &[u8], _: Duration) -> Result<(), CacheError> {
            Err(Self::error())
        }

        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(Self::error())
        }

        async fn delete(&self, _: &str) -> Result<bool, CacheError> {
            Err(Self::error())
        }
    }

    #[tokio::test]
    async fn test_insert_then_get_hits_cache() {
        let (service, store, _) = service();
        let order = test_order("svc-1");

        service.insert_order(&order).await.unwrap();
        let found = service.get_order("svc-1").await.unwrap();

        assert_eq!(found, order);
        // Insert cached the order, so the read never reached the store.
        assert_eq!(store.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_miss_reads_through_and_backfills() {
        let (service, store, cache) = service();
        let order = test_order("svc-2");
        service.insert_order(&order).await.unwrap();

        cache.delete("svc-2").await.unwrap();
        let found = service.get_order("svc-2").await.unwrap();
        assert_eq!(found, order);
        assert_eq!(store.get_calls(), 1);

        // The miss backfilled the cache, so a second read is a hit.
        let again = service.get_order("svc-2").await.unwrap();
        assert_eq!(again, order);
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_reads_through() {
        let (service, store, cache) = service();
        let order = test_order("svc-3");
        service.insert_order(&order).await.unwrap();

        cache
            .set("svc-3", b"{ not json", Duration::from_secs(60))
            .await
            .unwrap();

        let found = service.get_order("svc-3").await.unwrap();
        assert_eq!(found, order);
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (service, _, _) = service();
        let err = service.get_order("missing").await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(uid) if uid == "missing"));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_reported_as_missing() {
        let (service, store, _) = service();
        let order = test_order("svc-4");
        service.insert_order(&order).await.unwrap();

        store.fail_gets(true);
        let err = service.get_order("svc-5").await.unwrap_err();
        assert!(matches!(err, OrderError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_invalid_order_never_reaches_store() {
        let (service, store, _) = service();
        let order = test_order("");

        let err = service.insert_order(&order).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_persistence_error() {
        let (service, store, _) = service();
        let order = test_order("svc-6");

        service.insert_order(&order).await.unwrap();
        let err = service.insert_order(&order).await.unwrap_err();

        assert!(matches!(
            err,
            OrderError::Persistence(StoreError::Duplicate)
        ));
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_outage_degrades_but_does_not_fail() {
        let store = Arc::new(MemoryStore::new());
        let service = OrderService::new(store.clone(), Arc::new(FailingCache), Duration::ZERO);
        let order = test_order("svc-7");

        service.insert_order(&order).await.unwrap();
        let found = service.get_order("svc-7").await.unwrap();

        assert_eq!(found, order);
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_warm_up_loads_every_order() {
        let (service, store, cache) = service();
        for uid in ["warm-1", "warm-2", "warm-3"] {
            store.insert_order(&test_order(uid)).await.unwrap();
        }

        let loaded = service.warm_up().await.unwrap();
        assert_eq!(loaded, 3);
        assert_eq!(store.get_calls(), 3);
        assert!(cache.get("warm-2").await.unwrap().is_some());

        // Reads after warm-up are pure cache hits.
        service.get_order("warm-1").await.unwrap();
        assert_eq!(store.get_calls(), 3);
    }

    #[tokio::test]
    async fn test_warm_up_aborts_on_store_failure() {
        let (service, store, _) = service();
        store.insert_order(&test_order("warm-4")).await.unwrap();

        store.fail_gets(true);
        let err = service.warm_up().await.unwrap_err();
        assert!(matches!(err, OrderError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_warm_up_of_empty_store_is_zero() {
        let (service, _, _) = service();
        assert_eq!(service.warm_up().await.unwrap(), 0);
    }
}
