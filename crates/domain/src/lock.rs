//! Per-order mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use store::OrderId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<OrderId, Arc<AsyncMutex<()>>>>>;

/// Registry of one async mutex per order.
///
/// Operations on the same order queue up; different orders never contend.
/// An entry lives only while someone holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct OrderLocks {
    registry: Registry,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`.
    pub async fn lock(&self, order_id: OrderId) -> OrderLockGuard {
        let mutex = self
            .registry
            .lock()
            .entry(order_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;

        OrderLockGuard {
            order_id,
            registry: self.registry.clone(),
            guard: Some(guard),
        }
    }

    /// Number of orders currently locked or waited on.
    pub fn active(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Releases the order on drop.
#[derive(Debug)]
pub struct OrderLockGuard {
    order_id: OrderId,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        // Unlock first so a waiter can proceed, then drop the entry if the
        // registry holds the only remaining reference.
        self.guard.take();
        if registry
            .get(&self.order_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            registry.remove(&self.order_id);
        }
    }
}
