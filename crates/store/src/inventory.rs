use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::recompute_stock_status;
use serde::{Deserialize, Serialize};

use crate::{ProductId, Result, StockStatus};

/// Addresses one inventory record: a product, or one variant of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryKey {
    pub product_id: ProductId,

    /// Variant key (`"name:value"`), `None` for the product itself.
    pub variant: Option<String>,
}

impl InventoryKey {
    /// Key of the product-level record.
    pub fn product(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            variant: None,
        }
    }

    /// Key of a variant record.
    pub fn variant(product_id: impl Into<ProductId>, variant: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            variant: Some(variant.into()),
        }
    }

    /// Variant column value; empty for the product-level record.
    pub fn variant_column(&self) -> &str {
        self.variant.as_deref().unwrap_or("")
    }
}

impl std::fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}[{}]", self.product_id, variant),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// Available quantity and stock flags for one product or variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub key: InventoryKey,

    /// Units available. Only backorder records go below zero.
    pub quantity: i64,

    pub low_stock_threshold: i64,
    pub track_quantity: bool,
    pub allow_backorder: bool,
    pub stock_status: StockStatus,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// A tracked record without backorder.
    pub fn tracked(key: InventoryKey, quantity: i64, low_stock_threshold: i64) -> Self {
        let mut record = Self {
            key,
            quantity,
            low_stock_threshold,
            track_quantity: true,
            allow_backorder: false,
            stock_status: StockStatus::InStock,
            updated_at: Utc::now(),
        };
        record.refresh_status();
        record
    }

    /// A record whose quantity is not tracked.
    pub fn untracked(key: InventoryKey) -> Self {
        Self {
            key,
            quantity: 0,
            low_stock_threshold: 0,
            track_quantity: false,
            allow_backorder: false,
            stock_status: StockStatus::InStock,
            updated_at: Utc::now(),
        }
    }

    /// Sets the backorder flag.
    pub fn with_backorder(mut self, allow_backorder: bool) -> Self {
        self.allow_backorder = allow_backorder;
        self.refresh_status();
        self
    }

    /// Recomputes `stock_status` from the current quantity and flags.
    pub fn refresh_status(&mut self) {
        self.stock_status = recompute_stock_status(
            self.quantity,
            self.low_stock_threshold,
            self.track_quantity,
            self.allow_backorder,
        );
    }

    /// Returns true if `quantity` units can be taken right now.
    pub fn can_take(&self, quantity: u32) -> bool {
        !self.track_quantity || self.allow_backorder || self.quantity >= i64::from(quantity)
    }
}

/// Storage of inventory records.
///
/// `try_decrement` and `increment` must each be a single atomic step with
/// respect to other calls on the same key.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Creates or replaces a record. Used by catalog administration and seeding.
    async fn put_inventory(&self, record: InventoryRecord) -> Result<()>;

    /// Loads a record.
    async fn get_inventory(&self, key: &InventoryKey) -> Result<Option<InventoryRecord>>;

    /// Takes `quantity` units if the record allows it, recomputing stock status.
    ///
    /// Untracked records are returned unchanged. Fails with
    /// `InsufficientStock` when a tracked, non-backorder record has fewer
    /// units than requested and with `InventoryNotFound` for unknown keys.
    async fn try_decrement(&self, key: &InventoryKey, quantity: u32) -> Result<InventoryRecord>;

    /// Returns `quantity` units, recomputing stock status.
    async fn increment(&self, key: &InventoryKey, quantity: u32) -> Result<InventoryRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_includes_variant() {
        assert_eq!(InventoryKey::product("p1").to_string(), "p1");
        assert_eq!(InventoryKey::variant("p1", "size:M").to_string(), "p1[size:M]");
    }

    #[test]
    fn tracked_record_derives_status() {
        let record = InventoryRecord::tracked(InventoryKey::product("p1"), 0, 3);
        assert_eq!(record.stock_status, StockStatus::OutOfStock);

        let record = InventoryRecord::tracked(InventoryKey::product("p1"), 0, 3).with_backorder(true);
        assert_eq!(record.stock_status, StockStatus::Backorder);
    }

    #[test]
    fn can_take_respects_flags() {
        let record = InventoryRecord::tracked(InventoryKey::product("p1"), 2, 0);
        assert!(record.can_take(2));
        assert!(!record.can_take(3));
        assert!(record.clone().with_backorder(true).can_take(3));
        assert!(InventoryRecord::untracked(InventoryKey::product("p1")).can_take(100));
    }
}
