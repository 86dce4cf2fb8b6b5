//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// PendingConfirmation ─┐
///                      ├──► Confirmed ──► Processing ──► Shipped ──► Delivered
/// PaymentPending ──────┘        │             │             │
///                               └─────────────┴─────────────┴──► Refunded
///
/// any non-terminal status ──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Awaiting admin verification of a confirmation code.
    PendingConfirmation,

    /// Awaiting payment against a third-party reference.
    #[default]
    PaymentPending,

    /// Payment verified.
    Confirmed,

    Processing,
    Shipped,

    /// Terminal.
    Delivered,

    /// Terminal.
    Cancelled,

    /// Terminal.
    Refunded,
}

impl OrderStatus {
    /// Statuses in which an order holds reserved stock without payment.
    pub const UNPAID: [OrderStatus; 2] =
        [OrderStatus::PendingConfirmation, OrderStatus::PaymentPending];

    /// Returns true while the order awaits payment and carries a deadline.
    pub fn is_unpaid(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingConfirmation | OrderStatus::PaymentPending
        )
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Returns true if the transition table allows moving to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        match (self, next) {
            (PendingConfirmation | PaymentPending, Confirmed) => true,
            (Confirmed, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (Confirmed | Processing | Shipped, Refunded) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingConfirmation => "pending-confirmation",
            OrderStatus::PaymentPending => "payment-pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses a status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending-confirmation" => Some(OrderStatus::PendingConfirmation),
            "payment-pending" => Some(OrderStatus::PaymentPending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
