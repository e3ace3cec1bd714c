use async_trait::async_trait;

use crate::domain::{DeadLetterRecord, Order};
use crate::error::StoreError;

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgOrderStore;

// ============================================================================
// Storage Abstraction
// ============================================================================
//
// The store is the system of record. An order is persisted exactly once,
// atomically with its delivery, payment, and items; reads return the full
// aggregate with items in insertion order.
//
// ============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a validated aggregate. `Duplicate` when the uid already
    /// exists; nothing is partially written on failure.
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Loads the full aggregate for `order_uid`.
    async fn get_order(&self, order_uid: &str) -> Result<Order, StoreError>;

    /// All known order uids, used to warm the cache at startup.
    async fn list_order_uids(&self) -> Result<Vec<String>, StoreError>;

    /// Appends a terminal failure record to the dead-letter table.
    async fn append_dead_letter(&self, record: &DeadLetterRecord) -> Result<(), StoreError>;
}
