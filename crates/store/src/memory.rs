use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    ExpirationQuery, InventoryKey, InventoryRecord, InventoryStore, OrderId, OrderRecord,
    OrderStore, Result, StoreError, Version,
};

#[derive(Debug, Default)]
struct OrderTable {
    by_id: HashMap<OrderId, OrderRecord>,
    by_number: HashMap<String, OrderId>,
}

#[derive(Debug, Default)]
struct FailureInjection {
    fail_inserts: bool,
    fail_updates_for: HashSet<OrderId>,
    insert_delay: Option<Duration>,
}

/// In-memory store for tests and single-process deployments.
///
/// Provides the same guarantees as the PostgreSQL implementation: order
/// updates are version-checked and inventory changes happen under a single
/// write lock.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<OrderTable>>,
    inventory: Arc<RwLock<HashMap<InventoryKey, InventoryRecord>>>,
    failures: Arc<RwLock<FailureInjection>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.by_id.len()
    }

    /// Makes every subsequent order insert fail until reset.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.failures.write().await.fail_inserts = fail;
    }

    /// Holds every subsequent order insert for `delay` before writing.
    pub async fn set_insert_delay(&self, delay: Option<Duration>) {
        self.failures.write().await.insert_delay = delay;
    }

    /// Makes updates of one order fail until reset.
    pub async fn set_fail_on_update(&self, order_id: OrderId, fail: bool) {
        let mut failures = self.failures.write().await;
        if fail {
            failures.fail_updates_for.insert(order_id);
        } else {
            failures.fail_updates_for.remove(&order_id);
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, mut record: OrderRecord) -> Result<Version> {
        let (fail, delay) = {
            let failures = self.failures.read().await;
            (failures.fail_inserts, failures.insert_delay)
        };
        if fail {
            return Err(StoreError::Unavailable("order insert rejected".to_string()));
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut table = self.orders.write().await;

        if table.by_id.contains_key(&record.order_id) {
            return Err(StoreError::DuplicateOrder(record.order_id));
        }
        if table.by_number.contains_key(&record.order_number) {
            return Err(StoreError::DuplicateOrderNumber(record.order_number));
        }

        record.version = Version::first();
        table
            .by_number
            .insert(record.order_number.clone(), record.order_id);
        table.by_id.insert(record.order_id, record);

        Ok(Version::first())
    }

    async fn update_order(&self, mut record: OrderRecord, expected: Version) -> Result<Version> {
        if self
            .failures
            .read()
            .await
            .fail_updates_for
            .contains(&record.order_id)
        {
            return Err(StoreError::Unavailable(format!(
                "update of order {} rejected",
                record.order_id
            )));
        }

        let mut table = self.orders.write().await;

        let current = table
            .by_id
            .get(&record.order_id)
            .ok_or(StoreError::OrderNotFound(record.order_id))?;

        if current.version != expected {
            tracing::debug!(
                order_id = %record.order_id,
                %expected,
                actual = %current.version,
                "order version conflict"
            );
            metrics::counter!("store_version_conflicts_total", "backend" => "memory").increment(1);
            return Err(StoreError::ConcurrencyConflict {
                order_id: record.order_id,
                expected,
                actual: current.version,
            });
        }

        // The number is immutable once assigned; keep the stored one.
        record.order_number = current.order_number.clone();
        let new_version = expected.next();
        record.version = new_version;
        table.by_id.insert(record.order_id, record);

        Ok(new_version)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.orders.read().await.by_id.get(&order_id).cloned())
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<OrderRecord>> {
        let table = self.orders.read().await;
        Ok(table
            .by_number
            .get(order_number)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_expired(&self, query: ExpirationQuery) -> Result<Vec<OrderRecord>> {
        let table = self.orders.read().await;
        let mut expired: Vec<_> = table
            .by_id
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();

        expired.sort_by_key(|record| record.expires_at);
        expired.truncate(query.limit);

        Ok(expired)
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn put_inventory(&self, mut record: InventoryRecord) -> Result<()> {
        record.refresh_status();
        record.updated_at = Utc::now();
        self.inventory
            .write()
            .await
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn get_inventory(&self, key: &InventoryKey) -> Result<Option<InventoryRecord>> {
        Ok(self.inventory.read().await.get(key).cloned())
    }

    async fn try_decrement(&self, key: &InventoryKey, quantity: u32) -> Result<InventoryRecord> {
        let mut inventory = self.inventory.write().await;

        let record = inventory
            .get_mut(key)
            .ok_or_else(|| StoreError::InventoryNotFound(key.clone()))?;

        if !record.track_quantity {
            return Ok(record.clone());
        }

        if !record.can_take(quantity) {
            tracing::debug!(%key, requested = quantity, available = record.quantity, "decrement rejected");
            metrics::counter!("store_decrements_rejected_total", "backend" => "memory").increment(1);
            return Err(StoreError::InsufficientStock {
                key: key.clone(),
                requested: quantity,
                available: record.quantity,
            });
        }

        record.quantity -= i64::from(quantity);
        record.refresh_status();
        record.updated_at = Utc::now();

        Ok(record.clone())
    }

    async fn increment(&self, key: &InventoryKey, quantity: u32) -> Result<InventoryRecord> {
        let mut inventory = self.inventory.write().await;

        let record = inventory
            .get_mut(key)
            .ok_or_else(|| StoreError::InventoryNotFound(key.clone()))?;

        if record.track_quantity {
            record.quantity += i64::from(quantity);
            record.refresh_status();
            record.updated_at = Utc::now();
        }

        Ok(record.clone())
    }
}
