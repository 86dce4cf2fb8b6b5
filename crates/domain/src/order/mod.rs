//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod number;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::{CreateOrderRequest, MAX_LINE_QUANTITY, OrderItemRequest, StatusUpdate};
pub use events::{
    ExpirationExtendedData, OrderCancelledData, OrderEvent, OrderPlacedData,
    PaymentConfirmedData, StatusChangedData,
};
pub use number::OrderNumberGenerator;
pub use state::OrderStatus;
pub use value_objects::{
    Actor, Address, Cancellation, CustomerInfo, LineItem, Money, PaymentDeclaration,
    PaymentMethod, PaymentRecord, PaymentStatus, Pricing, ProductSnapshot, TimelineEntry,
    TrackingInfo, VariantSelector,
};

#[cfg(test)]
pub(crate) use aggregate::tests::{placed_data, placed_order};

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A request field is missing or malformed.
    #[error("Validation failed: {field} {reason}")]
    ValidationFailed { field: String, reason: &'static str },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// A line item asked for zero units.
    #[error("Invalid quantity for {product_id}: must be at least 1")]
    InvalidQuantity { product_id: String },

    /// The order was already placed.
    #[error("Order already placed")]
    AlreadyPlaced,

    /// Payment was already confirmed.
    #[error("Payment already confirmed")]
    AlreadyConfirmed,

    /// The order was already cancelled.
    #[error("Order already cancelled")]
    AlreadyCancelled,

    /// The transition table does not allow this move.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Only unpaid orders have a deadline to extend.
    #[error("Order in {status} status is not eligible for extension")]
    NotEligibleForExtension { status: OrderStatus },

    /// Extension outside the allowed range.
    #[error("Invalid extension of {hours} hours (allowed 1..={max})")]
    InvalidExtension { hours: u32, max: u32 },

    /// The order is paid or its deadline has not passed.
    #[error("Order in {status} status has not expired")]
    NotExpired { status: OrderStatus },
}

impl OrderError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ValidationFailed { .. }
            | OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidExtension { .. } => ErrorKind::Validation,
            _ => ErrorKind::Conflict,
        }
    }
}
