//! Inventory ledger: reservation and release of stock.

use std::time::Duration;

use store::{InventoryKey, InventoryRecord, InventoryStore};

use crate::error::DomainError;
use crate::order::LineItem;
use crate::timeout::bounded;

pub use common::recompute_stock_status;

/// Units of one product or variant held for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub key: InventoryKey,
    pub quantity: u32,
}

impl From<&LineItem> for Reservation {
    fn from(item: &LineItem) -> Self {
        Self {
            key: item.inventory_key(),
            quantity: item.quantity,
        }
    }
}

/// Reserves and releases stock on top of an [`InventoryStore`].
///
/// Each single reservation is one atomic conditional decrement in the store,
/// so concurrent reservations of the last unit cannot both succeed. Multi-line
/// operations are all-or-nothing: a failure part way undoes the lines already
/// applied.
#[derive(Debug, Clone)]
pub struct InventoryLedger<S> {
    store: S,
    timeout: Duration,
}

impl<S: InventoryStore> InventoryLedger<S> {
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

    /// Current record for a product or variant.
    pub async fn stock(&self, key: &InventoryKey) -> Result<Option<InventoryRecord>, DomainError> {
        bounded(self.timeout, "inventory read", self.store.get_inventory(key)).await
    }

    /// Takes `quantity` units, failing with `InsufficientStock` if they are not there.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn reserve(
        &self,
        key: &InventoryKey,
        quantity: u32,
    ) -> Result<InventoryRecord, DomainError> {
        match bounded(
            self.timeout,
            "inventory reserve",
            self.store.try_decrement(key, quantity),
        )
        .await
        {
            Ok(record) => {
                metrics::counter!("inventory_reservations_total").increment(1);
                tracing::debug!(
                    remaining = record.quantity,
                    stock_status = %record.stock_status,
                    "stock reserved"
                );
                Ok(record)
            }
            Err(e) => {
                if matches!(e, DomainError::InsufficientStock { .. }) {
                    metrics::counter!("inventory_reservation_rejected_total").increment(1);
                }
                tracing::debug!(error = %e, "reservation rejected");
                Err(e)
            }
        }
    }

    /// Returns `quantity` units.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn release(
        &self,
        key: &InventoryKey,
        quantity: u32,
    ) -> Result<InventoryRecord, DomainError> {
        let record = bounded(
            self.timeout,
            "inventory release",
            self.store.increment(key, quantity),
        )
        .await?;

        tracing::debug!(
            remaining = record.quantity,
            stock_status = %record.stock_status,
            "stock released"
        );
        Ok(record)
    }

    /// Reserves every line or none of them.
    pub async fn reserve_all(&self, reservations: &[Reservation]) -> Result<(), DomainError> {
        for (taken, reservation) in reservations.iter().enumerate() {
            if let Err(e) = self.reserve(&reservation.key, reservation.quantity).await {
                self.compensate_release(&reservations[..taken]).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Releases every line or none of them.
    pub async fn release_all(&self, reservations: &[Reservation]) -> Result<(), DomainError> {
        for (released, reservation) in reservations.iter().enumerate() {
            if let Err(e) = self.release(&reservation.key, reservation.quantity).await {
                self.compensate_reserve(&reservations[..released]).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Best-effort release used to undo reservations. Failures are logged for
    /// manual reconciliation.
    pub async fn compensate_release(&self, reservations: &[Reservation]) {
        for reservation in reservations.iter().rev() {
            if let Err(e) = self.release(&reservation.key, reservation.quantity).await {
                reconciliation_required("release", reservation, &e);
            }
        }
    }

    /// Best-effort re-reservation used to undo releases. Failures are logged
    /// for manual reconciliation.
    pub async fn compensate_reserve(&self, reservations: &[Reservation]) {
        for reservation in reservations.iter().rev() {
            if let Err(e) = self.reserve(&reservation.key, reservation.quantity).await {
                reconciliation_required("reserve", reservation, &e);
            }
        }
    }
}

fn reconciliation_required(action: &'static str, reservation: &Reservation, error: &DomainError) {
    metrics::counter!("inventory_reconciliation_required_total").increment(1);
    tracing::error!(
        action,
        product_id = %reservation.key.product_id,
        variant = reservation.key.variant.as_deref().unwrap_or("-"),
        quantity = reservation.quantity,
        error = %error,
        "inventory compensation failed, manual reconciliation required"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InMemoryStore, StockStatus};

    async fn ledger_with(records: Vec<InventoryRecord>) -> (InventoryLedger<InMemoryStore>, InMemoryStore) {
        let store = InMemoryStore::new();
        for record in records {
            store.put_inventory(record).await.unwrap();
        }
        (InventoryLedger::new(store.clone()), store)
    }

    fn reservation(key: &InventoryKey, quantity: u32) -> Reservation {
        Reservation {
            key: key.clone(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_reserve_to_zero_marks_out_of_stock() {
        let key = InventoryKey::product("mug");
        let (ledger, _) = ledger_with(vec![InventoryRecord::tracked(key.clone(), 2, 1)]).await;

        let record = ledger.reserve(&key, 2).await.unwrap();
        assert_eq!(record.quantity, 0);
        assert_eq!(record.stock_status, StockStatus::OutOfStock);

        let err = ledger.reserve(&key, 1).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock { requested: 1, available: 0, .. }
        ));

        let record = ledger.release(&key, 2).await.unwrap();
        assert_eq!(record.quantity, 2);
        assert_eq!(record.stock_status, StockStatus::InStock);
    }

    #[tokio::test]
    async fn test_reserve_all_rolls_back_on_failure() {
        let mug = InventoryKey::product("mug");
        let shirt = InventoryKey::variant("shirt", "size:M");
        let (ledger, store) = ledger_with(vec![
            InventoryRecord::tracked(mug.clone(), 5, 1),
            InventoryRecord::tracked(shirt.clone(), 1, 0),
        ])
        .await;

        let result = ledger
            .reserve_all(&[reservation(&mug, 3), reservation(&shirt, 2)])
            .await;

        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));
        assert_eq!(store.get_inventory(&mug).await.unwrap().unwrap().quantity, 5);
        assert_eq!(store.get_inventory(&shirt).await.unwrap().unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_reserve_all_missing_record_is_unavailable() {
        let mug = InventoryKey::product("mug");
        let (ledger, store) = ledger_with(vec![InventoryRecord::tracked(mug.clone(), 5, 1)]).await;

        let result = ledger
            .reserve_all(&[
                reservation(&mug, 1),
                reservation(&InventoryKey::variant("mug", "color:red"), 1),
            ])
            .await;

        assert!(matches!(result, Err(DomainError::ProductUnavailable { .. })));
        assert_eq!(store.get_inventory(&mug).await.unwrap().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_release_all_rolls_back_on_failure() {
        let mug = InventoryKey::product("mug");
        let (ledger, store) = ledger_with(vec![InventoryRecord::tracked(mug.clone(), 0, 1)]).await;

        let result = ledger
            .release_all(&[
                reservation(&mug, 2),
                reservation(&InventoryKey::product("gone"), 1),
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(store.get_inventory(&mug).await.unwrap().unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_backorder_and_untracked_always_reserve() {
        let preorder = InventoryKey::product("preorder");
        let digital = InventoryKey::product("ebook");
        let (ledger, _) = ledger_with(vec![
            InventoryRecord::tracked(preorder.clone(), 1, 0).with_backorder(true),
            InventoryRecord::untracked(digital.clone()),
        ])
        .await;

        let record = ledger.reserve(&preorder, 3).await.unwrap();
        assert_eq!(record.quantity, -2);
        assert_eq!(record.stock_status, StockStatus::Backorder);

        let record = ledger.reserve(&digital, 1000).await.unwrap();
        assert_eq!(record.stock_status, StockStatus::InStock);
    }

    #[test]
    fn test_recompute_is_reexported() {
        assert_eq!(recompute_stock_status(0, 5, true, false), StockStatus::OutOfStock);
        assert_eq!(recompute_stock_status(3, 5, true, false), StockStatus::LowStock);
    }
}
