//! Derived stock status of an inventory record.

use serde::{Deserialize, Serialize};

/// Availability label shown in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    #[default]
    InStock,
    LowStock,
    OutOfStock,
    Backorder,
}

impl StockStatus {
    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in-stock",
            StockStatus::LowStock => "low-stock",
            StockStatus::OutOfStock => "out-of-stock",
            StockStatus::Backorder => "backorder",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in-stock" => Some(StockStatus::InStock),
            "low-stock" => Some(StockStatus::LowStock),
            "out-of-stock" => Some(StockStatus::OutOfStock),
            "backorder" => Some(StockStatus::Backorder),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the stock status from the current quantity and record flags.
///
/// Untracked records are always in stock. A tracked quantity at or below
/// zero is out of stock, or backorder when the record accepts backorders.
pub fn recompute_stock_status(
    quantity: i64,
    low_stock_threshold: i64,
    track_quantity: bool,
    allow_backorder: bool,
) -> StockStatus {
    if !track_quantity {
        return StockStatus::InStock;
    }
    if quantity <= 0 {
        if allow_backorder {
            StockStatus::Backorder
        } else {
            StockStatus::OutOfStock
        }
    } else if quantity <= low_stock_threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_is_out_of_stock() {
        assert_eq!(
            recompute_stock_status(0, 5, true, false),
            StockStatus::OutOfStock
        );
    }

    #[test]
    fn zero_quantity_with_backorder_is_backorder() {
        assert_eq!(
            recompute_stock_status(0, 5, true, true),
            StockStatus::Backorder
        );
        assert_eq!(
            recompute_stock_status(-3, 5, true, true),
            StockStatus::Backorder
        );
    }

    #[test]
    fn at_threshold_is_low_stock() {
        assert_eq!(
            recompute_stock_status(5, 5, true, false),
            StockStatus::LowStock
        );
        assert_eq!(
            recompute_stock_status(1, 5, true, false),
            StockStatus::LowStock
        );
    }

    #[test]
    fn above_threshold_is_in_stock() {
        assert_eq!(
            recompute_stock_status(6, 5, true, false),
            StockStatus::InStock
        );
    }

    #[test]
    fn untracked_is_always_in_stock() {
        assert_eq!(
            recompute_stock_status(0, 5, false, false),
            StockStatus::InStock
        );
    }

    #[test]
    fn string_form_round_trips() {
        for status in [
            StockStatus::InStock,
            StockStatus::LowStock,
            StockStatus::OutOfStock,
            StockStatus::Backorder,
        ] {
            assert_eq!(StockStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StockStatus::parse("sold-out"), None);
    }
}
