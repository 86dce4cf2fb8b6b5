use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{OrderId, Result, Version};

/// A persisted order.
///
/// `document` holds the full serialized order; the other fields are
/// denormalized copies used for lookups and the expiration index. The
/// domain layer keeps them in sync on every write.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: String,
    pub customer_email: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub version: Version,
    pub updated_at: DateTime<Utc>,
    pub document: serde_json::Value,
}

/// Selects orders whose payment deadline has passed.
#[derive(Debug, Clone)]
pub struct ExpirationQuery {
    /// Deadline cut-off; orders with `expires_at <= now` match.
    pub now: DateTime<Utc>,

    /// Only orders in one of these statuses match.
    pub statuses: Vec<String>,

    /// Maximum number of records returned.
    pub limit: usize,
}

impl ExpirationQuery {
    /// Creates a query for orders in `statuses` expired at `now`.
    pub fn new(now: DateTime<Utc>, statuses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            now,
            statuses: statuses.into_iter().map(Into::into).collect(),
            limit: 100,
        }
    }

    /// Sets the batch limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Returns true if the record matches this query.
    pub fn matches(&self, record: &OrderRecord) -> bool {
        self.statuses.iter().any(|s| *s == record.status)
            && record.expires_at.is_some_and(|at| at <= self.now)
    }
}

/// Storage of order documents.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order at [`Version::first`].
    ///
    /// Fails with `DuplicateOrderNumber` if the order number is taken and
    /// `DuplicateOrder` if the ID already exists.
    async fn insert_order(&self, record: OrderRecord) -> Result<Version>;

    /// Replaces an order if its stored version equals `expected`.
    ///
    /// Returns the new version. Fails with `ConcurrencyConflict` when another
    /// writer got there first.
    async fn update_order(&self, record: OrderRecord, expected: Version) -> Result<Version>;

    /// Loads an order by ID.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Loads an order by its public order number.
    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<OrderRecord>>;

    /// Returns expired orders, earliest deadline first.
    async fn find_expired(&self, query: ExpirationQuery) -> Result<Vec<OrderRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(status: &str, expires_at: Option<DateTime<Utc>>) -> OrderRecord {
        OrderRecord {
            order_id: OrderId::new(),
            order_number: "ORD-1".to_string(),
            status: status.to_string(),
            customer_email: "a@b.co".to_string(),
            expires_at,
            version: Version::first(),
            updated_at: Utc::now(),
            document: serde_json::json!({}),
        }
    }

    #[test]
    fn expiration_query_matches_past_deadline_in_listed_status() {
        let now = Utc::now();
        let query = ExpirationQuery::new(now, ["payment-pending"]);

        assert!(query.matches(&record("payment-pending", Some(now - Duration::minutes(1)))));
        assert!(query.matches(&record("payment-pending", Some(now))));
        assert!(!query.matches(&record("payment-pending", Some(now + Duration::minutes(1)))));
        assert!(!query.matches(&record("cancelled", Some(now - Duration::minutes(1)))));
        assert!(!query.matches(&record("payment-pending", None)));
    }
}
