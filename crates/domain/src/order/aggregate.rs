//! Order aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use store::{OrderId, Version};

use crate::aggregate::Aggregate;

use super::{
    Actor, Address, Cancellation, CustomerInfo, LineItem, Money, OrderError, OrderEvent,
    OrderStatus, PaymentRecord, PaymentStatus, Pricing, TimelineEntry, TrackingInfo,
    events::{
        ExpirationExtendedData, OrderCancelledData, OrderPlacedData, PaymentConfirmedData,
        StatusChangedData,
    },
};

/// Order aggregate root.
///
/// Holds the customer and address snapshots, priced line items, the payment
/// sub-record and the append-only timeline. Every event appends exactly one
/// timeline entry. `expires_at` is set exactly while the status is unpaid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: String,

    /// Version the order was loaded at; lives in the store, not the document.
    #[serde(skip)]
    version: Version,

    customer: CustomerInfo,
    shipping_address: Address,
    billing_address: Address,
    items: Vec<LineItem>,
    pricing: Pricing,
    payment: PaymentRecord,
    status: OrderStatus,
    timeline: Vec<TimelineEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    extension_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tracking: Option<TrackingInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    cancellation: Option<Cancellation>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(*data),
            OrderEvent::PaymentConfirmed(data) => self.apply_payment_confirmed(data),
            OrderEvent::StatusChanged(data) => self.apply_status_changed(data),
            OrderEvent::OrderCancelled(data) => self.apply_order_cancelled(data),
            OrderEvent::ExpirationExtended(data) => self.apply_expiration_extended(data),
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the human-readable order number.
    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    pub fn payment(&self) -> &PaymentRecord {
        &self.payment
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Returns the payment deadline, present only while unpaid.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns how many times the deadline was extended.
    pub fn extension_count(&self) -> u32 {
        self.extension_count
    }

    pub fn tracking(&self) -> Option<&TrackingInfo> {
        self.tracking.as_ref()
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order has been placed.
    pub fn is_placed(&self) -> bool {
        !self.order_number.is_empty()
    }

    /// Returns true if the order is unpaid and its deadline is at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status.is_unpaid() && self.expires_at.is_some_and(|at| at <= now)
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order.
    pub fn place(&self, data: OrderPlacedData) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_placed() {
            return Err(OrderError::AlreadyPlaced);
        }

        if data.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        if let Some(item) = data.items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id.to_string(),
            });
        }

        if !data.status.is_unpaid() {
            return Err(OrderError::ValidationFailed {
                field: "status".to_string(),
                reason: "must be an unpaid status",
            });
        }

        let subtotal: Money = data.items.iter().map(|item| item.line_total).sum();
        if !data.pricing.is_consistent() || data.pricing.subtotal != subtotal {
            return Err(OrderError::ValidationFailed {
                field: "pricing".to_string(),
                reason: "does not match the line items",
            });
        }

        Ok(vec![OrderEvent::OrderPlaced(Box::new(data))])
    }

    /// Confirms payment, moving an unpaid order to confirmed.
    pub fn confirm_payment(
        &self,
        actor: Actor,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.payment.status == PaymentStatus::Confirmed {
            return Err(OrderError::AlreadyConfirmed);
        }

        if !self.status.can_transition_to(OrderStatus::Confirmed) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Confirmed,
            });
        }

        Ok(vec![OrderEvent::payment_confirmed(actor, notes, now)])
    }

    /// Moves the order along the fulfilment path.
    ///
    /// Confirmation and cancellation have their own commands and are
    /// rejected here.
    pub fn change_status(
        &self,
        to: OrderStatus,
        message: Option<String>,
        tracking: Option<TrackingInfo>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyCancelled);
        }

        if matches!(to, OrderStatus::Confirmed | OrderStatus::Cancelled)
            || !self.status.can_transition_to(to)
        {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Order status changed to {to}"));

        Ok(vec![OrderEvent::StatusChanged(StatusChangedData {
            from: self.status,
            to,
            message,
            tracking,
            changed_at: now,
            actor,
        })])
    }

    /// Cancels the order.
    pub fn cancel(
        &self,
        reason: impl Into<String>,
        actor: Actor,
        now: DateTime<Utc>,
        expired: bool,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyCancelled);
        }

        if !self.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }

        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(OrderError::ValidationFailed {
                field: "reason".to_string(),
                reason: "must not be empty",
            });
        }

        Ok(vec![OrderEvent::order_cancelled(reason, actor, now, expired)])
    }

    /// Pushes the payment deadline back by `extra_hours`.
    pub fn extend_expiration(
        &self,
        extra_hours: u32,
        max_hours: u32,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let Some(previous) = self.expires_at.filter(|_| self.status.is_unpaid()) else {
            return Err(OrderError::NotEligibleForExtension {
                status: self.status,
            });
        };

        if extra_hours == 0 || extra_hours > max_hours {
            return Err(OrderError::InvalidExtension {
                hours: extra_hours,
                max: max_hours,
            });
        }

        Ok(vec![OrderEvent::ExpirationExtended(ExpirationExtendedData {
            previous_expires_at: previous,
            expires_at: previous + Duration::hours(i64::from(extra_hours)),
            extra_hours,
            actor,
            extended_at: now,
        })])
    }

    /// Checks that the order may be cancelled for non-payment at `now`.
    pub fn ensure_expired(&self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyCancelled);
        }

        if !self.is_expired(now) {
            return Err(OrderError::NotExpired {
                status: self.status,
            });
        }

        Ok(())
    }
}

// Apply event helpers
impl Order {
    fn record(&mut self, status: OrderStatus, message: String, at: DateTime<Utc>, actor: Actor) {
        self.timeline.push(TimelineEntry {
            status,
            message,
            timestamp: at,
            actor,
        });
        self.updated_at = at;
    }

    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        let message = match data.status {
            OrderStatus::PendingConfirmation => "Order placed, awaiting payment verification",
            _ => "Order placed, awaiting payment",
        };

        self.id = data.order_id;
        self.order_number = data.order_number;
        self.customer = data.customer;
        self.shipping_address = data.shipping_address;
        self.billing_address = data.billing_address;
        self.items = data.items;
        self.pricing = data.pricing;
        self.payment = data.payment;
        self.status = data.status;
        self.expires_at = Some(data.expires_at);
        self.created_at = data.placed_at;
        self.record(data.status, message.to_string(), data.placed_at, data.actor);
    }

    fn apply_payment_confirmed(&mut self, data: PaymentConfirmedData) {
        let message = data
            .notes
            .clone()
            .unwrap_or_else(|| "Payment confirmed".to_string());

        self.payment.status = PaymentStatus::Confirmed;
        self.payment.verified_by = Some(data.confirmed_by.clone());
        self.payment.verified_at = Some(data.confirmed_at);
        self.payment.notes = data.notes;
        self.status = OrderStatus::Confirmed;
        self.expires_at = None;
        self.record(
            OrderStatus::Confirmed,
            message,
            data.confirmed_at,
            data.confirmed_by,
        );
    }

    fn apply_status_changed(&mut self, data: StatusChangedData) {
        self.status = data.to;
        if data.tracking.is_some() {
            self.tracking = data.tracking;
        }
        if data.to == OrderStatus::Refunded {
            self.payment.status = PaymentStatus::Refunded;
        }
        self.record(data.to, data.message, data.changed_at, data.actor);
    }

    fn apply_order_cancelled(&mut self, data: OrderCancelledData) {
        self.status = OrderStatus::Cancelled;
        self.expires_at = None;
        self.cancellation = Some(Cancellation {
            reason: data.reason.clone(),
            actor: data.actor.clone(),
            cancelled_at: data.cancelled_at,
            refund_issued: false,
        });
        self.record(
            OrderStatus::Cancelled,
            data.reason,
            data.cancelled_at,
            data.actor,
        );
    }

    fn apply_expiration_extended(&mut self, data: ExpirationExtendedData) {
        self.expires_at = Some(data.expires_at);
        self.extension_count += 1;
        self.record(
            self.status,
            format!("Payment deadline extended by {} hours", data.extra_hours),
            data.extended_at,
            data.actor,
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;
    use crate::order::{PaymentDeclaration, ProductSnapshot};

    pub(crate) fn placed_data(status: OrderStatus, now: DateTime<Utc>) -> OrderPlacedData {
        let item = LineItem::new(
            "widget",
            ProductSnapshot {
                name: "Widget".to_string(),
                sku: Some("W-1".to_string()),
                image: None,
                base_price: Money::from_cents(2500),
            },
            None,
            2,
            Money::from_cents(2500),
        )
        .unwrap();
        let declaration = match status {
            OrderStatus::PendingConfirmation => PaymentDeclaration::DirectTransfer {
                confirmation_code: "TX-42".to_string(),
            },
            _ => PaymentDeclaration::ThirdPartyReference {
                reference_number: "REF-42".to_string(),
                payer_name: "Ada".to_string(),
                amount: Money::from_cents(6400),
            },
        };

        OrderPlacedData {
            order_id: OrderId::new(),
            order_number: crate::order::OrderNumberGenerator::default().generate(now),
            customer: CustomerInfo {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone: "555-0100".to_string(),
            },
            shipping_address: Address {
                line1: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                postal_code: "12345".to_string(),
                country: "US".to_string(),
                ..Default::default()
            },
            billing_address: Address::default(),
            pricing: Pricing::new(
                item.line_total,
                Money::from_cents(1000),
                Money::from_cents(400),
                Money::zero(),
            ),
            items: vec![item],
            payment: PaymentRecord::from(&declaration),
            status,
            expires_at: now + Duration::hours(72),
            placed_at: now,
            actor: Actor::Customer,
        }
    }

    pub(crate) fn placed_order(status: OrderStatus, now: DateTime<Utc>) -> Order {
        let mut order = Order::default();
        let events = order.place(placed_data(status, now)).unwrap();
        order.apply_events(events);
        order
    }

    #[test]
    fn test_place_sets_deadline_and_first_entry() {
        let now = Utc::now();
        let order = placed_order(OrderStatus::PaymentPending, now);

        assert!(order.is_placed());
        assert_eq!(order.status(), OrderStatus::PaymentPending);
        assert_eq!(order.expires_at(), Some(now + Duration::hours(72)));
        assert_eq!(order.timeline().len(), 1);
        assert_eq!(order.timeline()[0].status, OrderStatus::PaymentPending);
        assert_eq!(order.pricing().total.cents(), 6400);
    }

    #[test]
    fn test_type_names_for_traces() {
        let now = Utc::now();
        let mut order = Order::default();
        let events = order.place(placed_data(OrderStatus::PaymentPending, now)).unwrap();

        assert_eq!(Order::aggregate_type(), "Order");
        assert_eq!(events[0].event_type(), "OrderPlaced");

        order.apply_events(events);
        let events = order.cancel("changed my mind", Actor::Customer, now, false).unwrap();
        assert_eq!(events[0].event_type(), "OrderCancelled");
    }

    #[test]
    fn test_place_twice_fails() {
        let order = placed_order(OrderStatus::PaymentPending, Utc::now());
        let result = order.place(placed_data(OrderStatus::PaymentPending, Utc::now()));
        assert!(matches!(result, Err(OrderError::AlreadyPlaced)));
    }

    #[test]
    fn test_place_rejects_mismatched_pricing() {
        let mut data = placed_data(OrderStatus::PaymentPending, Utc::now());
        data.pricing = Pricing::new(
            Money::from_cents(1),
            Money::zero(),
            Money::zero(),
            Money::zero(),
        );
        assert!(matches!(
            Order::default().place(data),
            Err(OrderError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_confirm_payment_clears_deadline() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PendingConfirmation, now);

        let events = order
            .confirm_payment(Actor::admin("admin-1"), Some("checked bank".to_string()), now)
            .unwrap();
        order.apply_events(events);

        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.payment().status, PaymentStatus::Confirmed);
        assert_eq!(order.payment().verified_by, Some(Actor::admin("admin-1")));
        assert!(order.expires_at().is_none());
        assert_eq!(order.timeline().len(), 2);
        assert_eq!(order.timeline()[1].message, "checked bank");

        let result = order.confirm_payment(Actor::admin("admin-1"), None, now);
        assert!(matches!(result, Err(OrderError::AlreadyConfirmed)));
    }

    #[test]
    fn test_confirm_payment_on_cancelled_order_is_rejected() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(order.cancel("no longer needed", Actor::Customer, now, false).unwrap());

        let result = order.confirm_payment(Actor::admin("a"), None, now);
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Confirmed
            })
        ));
    }

    #[test]
    fn test_fulfilment_path_with_tracking() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(order.confirm_payment(Actor::admin("a"), None, now).unwrap());

        for status in [OrderStatus::Processing, OrderStatus::Shipped] {
            let tracking = (status == OrderStatus::Shipped).then(|| TrackingInfo {
                tracking_number: "1Z999".to_string(),
                carrier: Some("UPS".to_string()),
            });
            let events = order
                .change_status(status, None, tracking, Actor::admin("a"), now)
                .unwrap();
            order.apply_events(events);
        }

        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.tracking().unwrap().tracking_number, "1Z999");
        assert_eq!(order.timeline().len(), 4);
        assert_eq!(order.timeline()[3].message, "Order status changed to shipped");

        let result = order.change_status(OrderStatus::Processing, None, None, Actor::System, now);
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }

    #[test]
    fn test_refund_marks_payment_refunded() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(order.confirm_payment(Actor::admin("a"), None, now).unwrap());
        order.apply_events(
            order
                .change_status(OrderStatus::Refunded, Some("refunded".into()), None, Actor::admin("a"), now)
                .unwrap(),
        );

        assert_eq!(order.status(), OrderStatus::Refunded);
        assert_eq!(order.payment().status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_change_status_rejects_dedicated_targets() {
        let now = Utc::now();
        let order = placed_order(OrderStatus::PaymentPending, now);

        for to in [OrderStatus::Confirmed, OrderStatus::Cancelled] {
            let result = order.change_status(to, None, None, Actor::admin("a"), now);
            assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
        }
    }

    #[test]
    fn test_cancel_records_cancellation() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(order.cancel("out of budget", Actor::Customer, now, false).unwrap());

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.expires_at().is_none());
        let cancellation = order.cancellation().unwrap();
        assert_eq!(cancellation.reason, "out of budget");
        assert!(!cancellation.refund_issued);

        let result = order.cancel("again", Actor::Customer, now, false);
        assert!(matches!(result, Err(OrderError::AlreadyCancelled)));
    }

    #[test]
    fn test_cannot_cancel_delivered_order() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(order.confirm_payment(Actor::admin("a"), None, now).unwrap());
        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            order.apply_events(
                order
                    .change_status(status, None, None, Actor::admin("a"), now)
                    .unwrap(),
            );
        }

        let result = order.cancel("too late", Actor::admin("a"), now, false);
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }

    #[test]
    fn test_extend_expiration() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(
            order
                .extend_expiration(24, 168, Actor::admin("a"), now)
                .unwrap(),
        );

        assert_eq!(order.expires_at(), Some(now + Duration::hours(96)));
        assert_eq!(order.extension_count(), 1);
        assert_eq!(order.timeline().len(), 2);
        assert_eq!(order.timeline()[1].status, OrderStatus::PaymentPending);

        assert!(matches!(
            order.extend_expiration(0, 168, Actor::admin("a"), now),
            Err(OrderError::InvalidExtension { .. })
        ));
        assert!(matches!(
            order.extend_expiration(200, 168, Actor::admin("a"), now),
            Err(OrderError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_extend_expiration_requires_unpaid_order() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(order.confirm_payment(Actor::admin("a"), None, now).unwrap());

        assert!(matches!(
            order.extend_expiration(24, 168, Actor::admin("a"), now),
            Err(OrderError::NotEligibleForExtension {
                status: OrderStatus::Confirmed
            })
        ));
    }

    #[test]
    fn test_ensure_expired() {
        let now = Utc::now();
        let order = placed_order(OrderStatus::PaymentPending, now);

        assert!(matches!(
            order.ensure_expired(now),
            Err(OrderError::NotExpired { .. })
        ));
        assert!(order.ensure_expired(now + Duration::hours(72)).is_ok());
    }

    #[test]
    fn test_document_round_trip_keeps_timeline() {
        let now = Utc::now();
        let mut order = placed_order(OrderStatus::PaymentPending, now);
        order.apply_events(order.cancel("bye", Actor::Customer, now, false).unwrap());

        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("version").is_none());
        assert!(json.get("expires_at").is_none());

        let restored: Order = serde_json::from_value(json).unwrap();
        assert_eq!(restored.timeline(), order.timeline());
        assert_eq!(restored.status(), OrderStatus::Cancelled);
        assert_eq!(restored.order_number(), order.order_number());
    }
}
