//! Loading and saving orders.

use std::time::Duration;

use chrono::{DateTime, Utc};
use store::{ExpirationQuery, OrderId, OrderRecord, OrderStore, Version};

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::order::{Order, OrderStatus};
use crate::timeout::bounded;

/// Maps [`Order`] aggregates to versioned store records.
///
/// Every save is a compare-and-swap against the version the order was
/// loaded at, so a writer holding stale state gets a concurrency conflict
/// instead of overwriting a newer transition.
#[derive(Debug, Clone)]
pub struct OrderRepository<S> {
    store: S,
    timeout: Duration,
}

impl<S: OrderStore> OrderRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(5),
        }
    }

    /// Sets the bound on each store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn to_record(order: &Order) -> Result<OrderRecord, DomainError> {
        Ok(OrderRecord {
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            status: order.status().as_str().to_string(),
            customer_email: order.customer().email.to_lowercase(),
            expires_at: order.expires_at(),
            version: order.version(),
            updated_at: order.updated_at(),
            document: serde_json::to_value(order)?,
        })
    }

    fn from_record(record: OrderRecord) -> Result<Order, DomainError> {
        let mut order: Order = serde_json::from_value(record.document)?;
        order.set_version(record.version);
        Ok(order)
    }

    /// Loads an order, returning None if it doesn't exist.
    pub async fn load(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        bounded(self.timeout, "order load", self.store.get_order(order_id))
            .await?
            .map(Self::from_record)
            .transpose()
    }

    /// Loads an order, failing with `OrderNotFound` if it doesn't exist.
    pub async fn load_existing(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.load(order_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))
    }

    /// Loads an order by its public number.
    pub async fn load_by_number(&self, order_number: &str) -> Result<Option<Order>, DomainError> {
        bounded(
            self.timeout,
            "order load",
            self.store.get_order_by_number(order_number),
        )
        .await?
        .map(Self::from_record)
        .transpose()
    }

    /// Persists a new order.
    ///
    /// An insert still running at the deadline gets one more period to
    /// settle. Only if it is still pending after that is it abandoned and the
    /// store probed; an insert that landed anyway counts as success.
    pub async fn insert(&self, order: &mut Order) -> Result<(), DomainError> {
        let record = Self::to_record(order)?;
        let insert = self.store.insert_order(record);
        tokio::pin!(insert);

        let version = match bounded(self.timeout, "order insert", &mut insert).await {
            Err(DomainError::Timeout(operation)) => {
                tracing::warn!(order_id = %order.id(), "order insert is slow, waiting for it to settle");
                match bounded(self.timeout, "order insert", &mut insert).await {
                    Err(DomainError::Timeout(_)) => self
                        .probe_stored(order)
                        .await
                        .ok_or(DomainError::Timeout(operation))?,
                    settled => settled?,
                }
            }
            settled => settled?,
        };

        order.set_version(version);
        Ok(())
    }

    /// Version of `order` if an abandoned insert of it was stored.
    async fn probe_stored(&self, order: &Order) -> Option<Version> {
        match self.load(order.id()).await {
            Ok(Some(stored)) if stored.order_number() == order.order_number() => {
                tracing::warn!(order_id = %order.id(), "insert was abandoned but order was stored");
                Some(stored.version())
            }
            _ => None,
        }
    }

    /// Saves an order loaded at `expected`.
    pub async fn save(&self, order: &mut Order, expected: Version) -> Result<(), DomainError> {
        let record = Self::to_record(order)?;
        let version = bounded(
            self.timeout,
            "order save",
            self.store.update_order(record, expected),
        )
        .await?;

        tracing::debug!(
            aggregate = Order::aggregate_type(),
            order_id = %order.id(),
            %version,
            "saved"
        );
        order.set_version(version);
        Ok(())
    }

    /// Unpaid orders whose deadline is at or before `now`, earliest first.
    pub async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>, DomainError> {
        let query = ExpirationQuery::new(now, OrderStatus::UNPAID.iter().map(|s| s.as_str()))
            .limit(limit);

        bounded(self.timeout, "expiration query", self.store.find_expired(query))
            .await?
            .into_iter()
            .map(Self::from_record)
            .collect()
    }
}
