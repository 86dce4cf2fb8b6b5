//! Domain error types.

use serde::Serialize;
use store::{ProductId, StoreError};
use thiserror::Error;

use crate::order::OrderError;

/// Coarse classification of a failure, used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input; the caller must change the request.
    Validation,

    /// The order or product does not exist.
    NotFound,

    /// The current state does not allow the operation.
    Conflict,

    /// Persistence or transport failure.
    Internal,
}

impl ErrorKind {
    /// Returns the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order precondition or input check failed.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// No order with this ID or number.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The product is inactive, unknown, or has no inventory record.
    #[error("Product unavailable: {}", item_label(.product_id, .variant))]
    ProductUnavailable {
        product_id: ProductId,
        variant: Option<String>,
    },

    /// A reservation was rejected.
    #[error(
        "Insufficient stock for {}: requested {requested}, available {available}",
        item_label(.product_id, .variant)
    )]
    InsufficientStock {
        product_id: ProductId,
        variant: Option<String>,
        requested: u32,
        available: i64,
    },

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The product catalog could not be read.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A store call did not finish within the configured timeout.
    #[error("Timed out during {0}")]
    Timeout(&'static str),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn item_label(product_id: &ProductId, variant: &Option<String>) -> String {
    match variant {
        Some(variant) => format!("{product_id} ({variant})"),
        None => product_id.to_string(),
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(order_id) => DomainError::OrderNotFound(order_id.to_string()),
            StoreError::InsufficientStock {
                key,
                requested,
                available,
            } => DomainError::InsufficientStock {
                product_id: key.product_id,
                variant: key.variant,
                requested,
                available,
            },
            StoreError::InventoryNotFound(key) => DomainError::ProductUnavailable {
                product_id: key.product_id,
                variant: key.variant,
            },
            other => DomainError::Store(other),
        }
    }
}

impl DomainError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(e) => e.kind(),
            DomainError::OrderNotFound(_) | DomainError::ProductUnavailable { .. } => {
                ErrorKind::NotFound
            }
            DomainError::InsufficientStock { .. } => ErrorKind::Conflict,
            DomainError::Store(StoreError::ConcurrencyConflict { .. }) => ErrorKind::Conflict,
            DomainError::Store(_)
            | DomainError::Catalog(_)
            | DomainError::Timeout(_)
            | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if a concurrent writer updated the order first.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::Store(StoreError::ConcurrencyConflict { .. }))
    }

    /// Short label used as a metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            DomainError::Order(OrderError::ValidationFailed { .. }) => "validation_failed",
            DomainError::Order(_) => "precondition",
            DomainError::OrderNotFound(_) => "order_not_found",
            DomainError::ProductUnavailable { .. } => "product_unavailable",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::Store(_) => "store",
            DomainError::Catalog(_) => "catalog",
            DomainError::Timeout(_) => "timeout",
            DomainError::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InventoryKey, OrderId, Version};

    #[test]
    fn test_store_insufficient_stock_keeps_item_details() {
        let err: DomainError = StoreError::InsufficientStock {
            key: InventoryKey::variant("shirt", "size:M"),
            requested: 3,
            available: 1,
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for shirt (size:M): requested 3, available 1"
        );
    }

    #[test]
    fn test_missing_inventory_is_product_unavailable() {
        let err: DomainError = StoreError::InventoryNotFound(InventoryKey::product("mug")).into();
        assert!(matches!(err, DomainError::ProductUnavailable { ref variant, .. } if variant.is_none()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_concurrency_conflict_kind() {
        let order_id = OrderId::new();
        let err: DomainError = StoreError::ConcurrencyConflict {
            order_id,
            expected: Version::first(),
            actual: Version::new(2),
        }
        .into();

        assert!(err.is_concurrency_conflict());
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: DomainError = StoreError::Unavailable("down".to_string()).into();
        assert!(!err.is_concurrency_conflict());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.reason(), "store");
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
