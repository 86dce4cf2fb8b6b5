use thiserror::Error;

use crate::{InventoryKey, OrderId, Version};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was modified since it was read.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this ID was already inserted.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order number is already assigned to another order.
    #[error("Order number already taken: {0}")]
    DuplicateOrderNumber(String),

    /// No inventory record exists for the product/variant.
    #[error("Inventory record not found: {0}")]
    InventoryNotFound(InventoryKey),

    /// A conditional decrement was rejected.
    #[error("Insufficient stock for {key}: requested {requested}, available {available}")]
    InsufficientStock {
        key: InventoryKey,
        requested: u32,
        available: i64,
    },

    /// The backing store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
