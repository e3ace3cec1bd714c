use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::OrderStore;
use crate::domain::{DeadLetterRecord, Order};
use crate::error::StoreError;

/// In-memory store double for unit tests. `fail_inserts` and `fail_gets`
/// flip the corresponding operations into database errors; `get_calls`
/// counts store reads so a test can prove that a cache hit never touched
/// the store.
#[derive(Default)]
pub struct MemoryStore {
    orders: Mutex<HashMap<String, Order>>,
    dead_letters: Mutex<Vec<DeadLetterRecord>>,
    fail_inserts: AtomicBool,
    fail_gets: AtomicBool,
    get_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterRecord> {
        self.dead_letters.lock().unwrap().clone()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }

        let mut orders = self.orders.lock().unwrap();
        if orders.contains_key(&order.order_uid) {
            return Err(StoreError::Duplicate);
        }
        orders.insert(order.order_uid.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_uid: &str) -> Result<Order, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.orders
            .lock()
            .unwrap()
            .get(order_uid)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_order_uids(&self) -> Result<Vec<String>, StoreError> {
        let mut uids: Vec<String> = self.orders.lock().unwrap().keys().cloned().collect();
        uids.sort();
        Ok(uids)
    }

    async fn append_dead_letter(&self, record: &DeadLetterRecord) -> Result<(), StoreError> {
        self.dead_letters.lock().unwrap().push(record.clone());
        Ok(())
    }
}
