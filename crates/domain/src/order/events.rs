//! Order domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::OrderId;

use crate::aggregate::DomainEvent;

use super::{
    Actor, Address, CustomerInfo, LineItem, OrderStatus, PaymentRecord, Pricing, TrackingInfo,
};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed and its stock reserved.
    OrderPlaced(Box<OrderPlacedData>),

    /// Payment was verified.
    PaymentConfirmed(PaymentConfirmedData),

    /// Status moved along the fulfilment path.
    StatusChanged(StatusChangedData),

    /// Order was cancelled and its stock restored.
    OrderCancelled(OrderCancelledData),

    /// Payment deadline was pushed back.
    ExpirationExtended(ExpirationExtendedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::PaymentConfirmed(_) => "PaymentConfirmed",
            OrderEvent::StatusChanged(_) => "StatusChanged",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::ExpirationExtended(_) => "ExpirationExtended",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer: CustomerInfo,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub items: Vec<LineItem>,
    pub pricing: Pricing,
    pub payment: PaymentRecord,

    /// Initial status, always an unpaid one.
    pub status: OrderStatus,

    /// Payment deadline.
    pub expires_at: DateTime<Utc>,

    pub placed_at: DateTime<Utc>,
    pub actor: Actor,
}

/// Data for PaymentConfirmed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedData {
    pub confirmed_by: Actor,
    pub notes: Option<String>,
    pub confirmed_at: DateTime<Utc>,
}

/// Data for StatusChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub message: String,
    pub tracking: Option<TrackingInfo>,
    pub changed_at: DateTime<Utc>,
    pub actor: Actor,
}

/// Data for OrderCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub reason: String,
    pub actor: Actor,
    pub cancelled_at: DateTime<Utc>,

    /// True when the sweeper cancelled the order after its deadline.
    pub expired: bool,
}

/// Data for ExpirationExtended event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationExtendedData {
    pub previous_expires_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub extra_hours: u32,
    pub actor: Actor,
    pub extended_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Creates a PaymentConfirmed event.
    pub fn payment_confirmed(
        confirmed_by: Actor,
        notes: Option<String>,
        confirmed_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::PaymentConfirmed(PaymentConfirmedData {
            confirmed_by,
            notes,
            confirmed_at,
        })
    }

    /// Creates an OrderCancelled event.
    pub fn order_cancelled(
        reason: impl Into<String>,
        actor: Actor,
        cancelled_at: DateTime<Utc>,
        expired: bool,
    ) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            reason: reason.into(),
            actor,
            cancelled_at,
            expired,
        })
    }

    /// Returns when the event happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(data) => data.placed_at,
            OrderEvent::PaymentConfirmed(data) => data.confirmed_at,
            OrderEvent::StatusChanged(data) => data.changed_at,
            OrderEvent::OrderCancelled(data) => data.cancelled_at,
            OrderEvent::ExpirationExtended(data) => data.extended_at,
        }
    }
}
