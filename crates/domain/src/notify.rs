//! Outbound notifications.
//!
//! The lifecycle engine publishes a [`Notification`] after each committed
//! transition. Delivery is fire-and-forget: a failed publish is logged and
//! counted, never returned to the caller.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use store::OrderId;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::order::{Order, OrderEvent, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    NewOrder,
    PaymentConfirmationRequested,
    PaymentConfirmed,
    OrderStatusChanged,
    OrderCancelled,
    OrderExpirationExtended,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new-order",
            NotificationKind::PaymentConfirmationRequested => "payment-confirmation-requested",
            NotificationKind::PaymentConfirmed => "payment-confirmed",
            NotificationKind::OrderStatusChanged => "order-status-changed",
            NotificationKind::OrderCancelled => "order-cancelled",
            NotificationKind::OrderExpirationExtended => "order-expiration-extended",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub order_id: OrderId,
    pub order_number: String,
    pub message: String,
}

impl Notification {
    fn new(kind: NotificationKind, order: &Order, message: String) -> Self {
        Self {
            kind,
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            message,
        }
    }

    /// Notifications for an event already applied to `order`.
    pub fn for_event(order: &Order, event: &OrderEvent) -> Vec<Notification> {
        let number = order.order_number();

        match event {
            OrderEvent::OrderPlaced(data) => {
                let mut out = vec![Notification::new(
                    NotificationKind::NewOrder,
                    order,
                    format!("New order {number} for {}", data.pricing.total),
                )];
                if data.status == OrderStatus::PendingConfirmation {
                    out.push(Notification::new(
                        NotificationKind::PaymentConfirmationRequested,
                        order,
                        format!(
                            "Order {number} awaits verification of code {}",
                            data.payment.confirmation_id
                        ),
                    ));
                }
                out
            }
            OrderEvent::PaymentConfirmed(_) => vec![Notification::new(
                NotificationKind::PaymentConfirmed,
                order,
                format!("Payment for order {number} confirmed"),
            )],
            OrderEvent::StatusChanged(data) => vec![Notification::new(
                NotificationKind::OrderStatusChanged,
                order,
                format!("Order {number} is now {}: {}", data.to, data.message),
            )],
            OrderEvent::OrderCancelled(data) => vec![Notification::new(
                NotificationKind::OrderCancelled,
                order,
                format!("Order {number} cancelled: {}", data.reason),
            )],
            OrderEvent::ExpirationExtended(data) => vec![Notification::new(
                NotificationKind::OrderExpirationExtended,
                order,
                format!(
                    "Payment deadline for order {number} extended to {}",
                    data.expires_at.format("%Y-%m-%d %H:%M UTC")
                ),
            )],
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("No subscribers for {0}")]
    NoSubscribers(NotificationKind),

    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

/// Publishes notifications to the dispatcher.
///
/// Implementations must not block.
pub trait Notifier: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Records notifications in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    inner: Arc<Mutex<InMemoryNotifierState>>,
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    fail: bool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every publish fail until reset.
    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().sent.clone()
    }

    /// Kinds published for one order, in order.
    pub fn kinds_for(&self, order_id: OrderId) -> Vec<NotificationKind> {
        self.inner
            .lock()
            .sent
            .iter()
            .filter(|n| n.order_id == order_id)
            .map(|n| n.kind)
            .collect()
    }

    pub fn clear(&self) {
        self.inner.lock().sent.clear();
    }
}

impl Notifier for InMemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut state = self.inner.lock();
        if state.fail {
            return Err(NotifyError::Unavailable("publishing disabled".to_string()));
        }
        state.sent.push(notification);
        Ok(())
    }
}

/// Fans notifications out to any number of subscribers.
///
/// Slow subscribers lag and lose the oldest messages rather than block the
/// publisher.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sender
            .send(notification)
            .map(|_| ())
            .map_err(|e| NotifyError::NoSubscribers(e.0.kind))
    }
}
