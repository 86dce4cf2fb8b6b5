//! The order lifecycle engine.
//!
//! [`OrderLifecycle`] is the only writer of order status. Every mutation
//! runs under the order's lock, re-reads the stored order, checks its
//! preconditions against that state, and saves with a compare-and-swap on
//! the version. Notifications go out only after the write commits.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use store::{InventoryStore, OrderId, OrderStore, StoreError};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::catalog::ProductCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::LifecycleConfig;
use crate::error::DomainError;
use crate::inventory::{InventoryLedger, Reservation};
use crate::lock::OrderLocks;
use crate::notify::{Notification, Notifier};
use crate::order::{
    Actor, CreateOrderRequest, LineItem, Money, Order, OrderError, OrderEvent,
    OrderItemRequest, OrderNumberGenerator, OrderPlacedData, OrderStatus, PaymentRecord,
    StatusUpdate, VariantSelector,
};
use crate::repository::OrderRepository;
use crate::timeout::bounded;

/// Reason recorded when the sweeper cancels an unpaid order.
pub const EXPIRED_REASON: &str = "Expired: payment window elapsed";

const MAX_NUMBER_ATTEMPTS: u32 = 5;

/// Creates, confirms, moves and cancels orders.
pub struct OrderLifecycle<S> {
    repository: OrderRepository<S>,
    ledger: InventoryLedger<S>,
    catalog: Arc<dyn ProductCatalog>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    locks: OrderLocks,
    numbers: OrderNumberGenerator,
    config: LifecycleConfig,
}

impl<S> OrderLifecycle<S>
where
    S: OrderStore + InventoryStore + Clone,
{
    /// Creates an engine with default configuration and the system clock.
    pub fn new(store: S, catalog: Arc<dyn ProductCatalog>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(store, catalog, notifier, LifecycleConfig::default())
    }

    pub fn with_config(
        store: S,
        catalog: Arc<dyn ProductCatalog>,
        notifier: Arc<dyn Notifier>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            repository: OrderRepository::new(store.clone()).with_timeout(config.store_timeout),
            ledger: InventoryLedger::new(store).with_timeout(config.store_timeout),
            catalog,
            notifier,
            clock: Arc::new(SystemClock),
            locks: OrderLocks::new(),
            numbers: OrderNumberGenerator::default(),
            config,
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn ledger(&self) -> &InventoryLedger<S> {
        &self.ledger
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        self.repository.store()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ---- creation ----

    /// Places an order, reserving stock for every line.
    ///
    /// Either the order is stored with all its stock reserved, or nothing
    /// changes: a failed reservation undoes the lines already taken, and a
    /// failed write releases them all.
    #[tracing::instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, DomainError> {
        let started = Instant::now();
        let result = self.place_order(request).await;
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    order_number = order.order_number(),
                    status = %order.status(),
                    total = %order.pricing().total,
                    "order created"
                );
            }
            Err(e) => {
                metrics::counter!("orders_create_failed_total", "reason" => e.reason())
                    .increment(1);
                tracing::warn!(error = %e, "order creation rejected");
            }
        }

        result
    }

    async fn place_order(&self, request: CreateOrderRequest) -> Result<Order, DomainError> {
        request.validate()?;

        let lines = self.price_lines(&request.items).await?;
        let subtotal = Money::checked_sum(lines.iter().map(|line| line.line_total)).ok_or_else(|| {
            OrderError::ValidationFailed {
                field: "pricing.subtotal".to_string(),
                reason: "amount out of range",
            }
        })?;
        let pricing = self.config.pricing.price(subtotal)?;
        let method = request.payment.method();
        let now = self.clock.now();
        let reservations: Vec<Reservation> = lines.iter().map(Reservation::from).collect();

        self.ledger.reserve_all(&reservations).await?;

        let data = OrderPlacedData {
            order_id: OrderId::new(),
            order_number: String::new(),
            billing_address: request.billing_or_shipping(),
            customer: request.customer,
            shipping_address: request.shipping_address,
            items: lines,
            pricing,
            payment: PaymentRecord::from(&request.payment),
            status: method.initial_status(),
            expires_at: now + self.config.payment_windows.window_for(method),
            placed_at: now,
            actor: Actor::Customer,
        };

        match self.insert_new_order(data).await {
            Ok((order, events)) => {
                self.publish(&order, &events);
                Ok(order)
            }
            Err(e) => {
                tracing::warn!(error = %e, "storing new order failed, releasing reserved stock");
                self.ledger.compensate_release(&reservations).await;
                Err(e)
            }
        }
    }

    /// Looks up every requested product and prices its line. No side effects.
    async fn price_lines(&self, items: &[OrderItemRequest]) -> Result<Vec<LineItem>, DomainError> {
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let unavailable = || DomainError::ProductUnavailable {
                product_id: item.product_id.clone(),
                variant: item.variant.as_ref().map(VariantSelector::key),
            };

            let product = bounded(
                self.config.store_timeout,
                "catalog lookup",
                self.catalog.get_product(&item.product_id),
            )
            .await?
            .filter(|product| product.active)
            .ok_or_else(unavailable)?;

            let variant = match &item.variant {
                Some(selector) => Some(product.variant(selector).ok_or_else(unavailable)?),
                None => None,
            };

            let adjustment = variant.map(|v| v.price_adjustment).unwrap_or_default();
            let unit_price = product.price.checked_add(adjustment).ok_or_else(|| {
                OrderError::ValidationFailed {
                    field: format!("items.{}.variant", item.product_id),
                    reason: "price out of range",
                }
            })?;
            lines.push(LineItem::new(
                product.id.clone(),
                product.snapshot(variant),
                item.variant.clone(),
                item.quantity,
                unit_price,
            )?);
        }

        Ok(lines)
    }

    /// Assigns a number and inserts. A number is replaced only if the store
    /// reports it taken, which means this order was never written.
    async fn insert_new_order(
        &self,
        mut data: OrderPlacedData,
    ) -> Result<(Order, Vec<OrderEvent>), DomainError> {
        let mut attempt = 1;

        loop {
            data.order_number = self.numbers.generate(data.placed_at);

            let mut order = Order::default();
            let events = order.place(data.clone())?;
            order.apply_events(events.clone());

            match self.repository.insert(&mut order).await {
                Ok(()) => return Ok((order, events)),
                Err(DomainError::Store(StoreError::DuplicateOrderNumber(number)))
                    if attempt < MAX_NUMBER_ATTEMPTS =>
                {
                    tracing::debug!(number, attempt, "order number taken, generating another");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ---- transitions ----

    /// Marks payment as verified and lifts the payment deadline.
    #[tracing::instrument(skip(self, notes))]
    pub async fn confirm_payment(
        &self,
        order_id: OrderId,
        actor: Actor,
        notes: Option<String>,
    ) -> Result<Order, DomainError> {
        let order = self
            .transition(order_id, |order, now| {
                order.confirm_payment(actor.clone(), notes.clone(), now)
            })
            .await?;

        metrics::counter!("payments_confirmed_total").increment(1);
        tracing::info!(order_number = order.order_number(), "payment confirmed");
        Ok(order)
    }

    /// Moves an order to another status.
    ///
    /// `cancelled` goes through [`cancel_order`](Self::cancel_order) so stock
    /// is restored; `confirmed` goes through
    /// [`confirm_payment`](Self::confirm_payment).
    #[tracing::instrument(skip(self, update), fields(to = %update.status))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        update: StatusUpdate,
        actor: Actor,
    ) -> Result<Order, DomainError> {
        let StatusUpdate {
            status,
            message,
            tracking,
        } = update;
        let message = message.filter(|m| !m.trim().is_empty());

        match status {
            OrderStatus::Cancelled => {
                let reason = message.unwrap_or_else(|| "Cancelled by administrator".to_string());
                return self.cancel_order(order_id, reason, actor).await;
            }
            OrderStatus::Confirmed => return self.confirm_payment(order_id, actor, message).await,
            _ => {}
        }

        let order = self
            .transition(order_id, |order, now| {
                order.change_status(status, message.clone(), tracking.clone(), actor.clone(), now)
            })
            .await?;

        tracing::info!(
            order_number = order.order_number(),
            status = %order.status(),
            "order status changed"
        );
        Ok(order)
    }

    /// Pushes an unpaid order's deadline back.
    #[tracing::instrument(skip(self))]
    pub async fn extend_expiration(
        &self,
        order_id: OrderId,
        extra_hours: u32,
        actor: Actor,
    ) -> Result<Order, DomainError> {
        let max_hours = self.config.max_extension_hours;
        let order = self
            .transition(order_id, |order, now| {
                order.extend_expiration(extra_hours, max_hours, actor.clone(), now)
            })
            .await?;

        tracing::info!(
            order_number = order.order_number(),
            expires_at = ?order.expires_at(),
            extensions = order.extension_count(),
            "payment deadline extended"
        );
        Ok(order)
    }

    /// Cancels an order and restores its stock.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        reason: impl Into<String>,
        actor: Actor,
    ) -> Result<Order, DomainError> {
        self.cancel(order_id, reason.into(), actor, false).await
    }

    /// Cancels an order whose payment deadline has passed.
    ///
    /// Same path as [`cancel_order`](Self::cancel_order), with the extra
    /// check, under the lock, that the order is still unpaid and past due.
    #[tracing::instrument(skip(self))]
    pub async fn expire_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.cancel(order_id, EXPIRED_REASON.to_string(), Actor::System, true)
            .await
    }

    async fn cancel(
        &self,
        order_id: OrderId,
        reason: String,
        actor: Actor,
        expired: bool,
    ) -> Result<Order, DomainError> {
        let _guard = self.locks.lock(order_id).await;
        let mut attempt = 0;

        loop {
            let mut order = self.repository.load_existing(order_id).await?;
            let expected = order.version();
            let now = self.clock.now();

            if expired {
                order.ensure_expired(now)?;
            }
            let events = order.cancel(reason.clone(), actor.clone(), now, expired)?;
            let reservations: Vec<Reservation> =
                order.items().iter().map(Reservation::from).collect();

            self.ledger.release_all(&reservations).await?;
            order.apply_events(events.clone());

            match self.repository.save(&mut order, expected).await {
                Ok(()) => {
                    let source = if expired { "expiration" } else { actor.label() };
                    metrics::counter!("orders_cancelled_total", "source" => source).increment(1);
                    tracing::info!(
                        order_number = order.order_number(),
                        source,
                        reason = %reason,
                        "order cancelled, stock restored"
                    );
                    self.publish(&order, &events);
                    return Ok(order);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "saving cancellation failed, taking released stock back");
                    self.ledger.compensate_reserve(&reservations).await;

                    if e.is_concurrency_conflict() && attempt < self.config.conflict_retries {
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Runs a state-only command under the order lock with CAS retries.
    async fn transition<F>(&self, order_id: OrderId, command: F) -> Result<Order, DomainError>
    where
        F: Fn(&Order, DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError>,
    {
        let _guard = self.locks.lock(order_id).await;
        let mut attempt = 0;

        loop {
            let mut order = self.repository.load_existing(order_id).await?;
            let expected = order.version();

            let events = command(&order, self.clock.now())?;
            order.apply_events(events.clone());

            match self.repository.save(&mut order, expected).await {
                Ok(()) => {
                    self.publish(&order, &events);
                    return Ok(order);
                }
                Err(e) if e.is_concurrency_conflict() && attempt < self.config.conflict_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, "order changed concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ---- queries ----

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.repository.load_existing(order_id).await
    }

    /// Public lookup by order number.
    ///
    /// When `email` is given it must match the customer's email, otherwise
    /// the order is reported as not found.
    pub async fn track_order(
        &self,
        order_number: &str,
        email: Option<&str>,
    ) -> Result<Order, DomainError> {
        let not_found = || DomainError::OrderNotFound(order_number.to_string());

        let order = self
            .repository
            .load_by_number(order_number)
            .await?
            .ok_or_else(not_found)?;

        match email {
            Some(email) if !order.customer().email.eq_ignore_ascii_case(email.trim()) => {
                Err(not_found())
            }
            _ => Ok(order),
        }
    }

    /// Unpaid orders past their deadline, earliest first.
    pub async fn expired_orders(&self, limit: usize) -> Result<Vec<Order>, DomainError> {
        self.repository.find_expired(self.clock.now(), limit).await
    }

    fn publish(&self, order: &Order, events: &[OrderEvent]) {
        for event in events {
            tracing::debug!(order_id = %order.id(), event = event.event_type(), "event committed");
            for notification in Notification::for_event(order, event) {
                let kind = notification.kind;
                if let Err(e) = self.notifier.publish(notification) {
                    metrics::counter!("notifications_dropped_total", "kind" => kind.as_str())
                        .increment(1);
                    tracing::warn!(
                        order_id = %order.id(),
                        event = event.event_type(),
                        kind = %kind,
                        error = %e,
                        "notification dropped"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogProduct, InMemoryCatalog};
    use crate::clock::ManualClock;
    use crate::notify::{InMemoryNotifier, NotificationKind};
    use crate::order::{Address, CustomerInfo, PaymentDeclaration};
    use chrono::Duration;
    use store::{InMemoryStore, InventoryKey, InventoryRecord};

    struct Fixture {
        lifecycle: OrderLifecycle<InMemoryStore>,
        store: InMemoryStore,
        notifier: InMemoryNotifier,
        clock: ManualClock,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        store
            .put_inventory(InventoryRecord::tracked(InventoryKey::product("mug"), 10, 2))
            .await
            .unwrap();
        store
            .put_inventory(InventoryRecord::tracked(InventoryKey::variant("shirt", "size:XL"), 3, 1))
            .await
            .unwrap();

        let catalog: InMemoryCatalog = [
            CatalogProduct::new("mug", "Mug", Money::from_cents(1200)),
            CatalogProduct::new("shirt", "Shirt", Money::from_cents(2000))
                .with_variant("size", "XL", Money::from_cents(300)),
            CatalogProduct::new("retired", "Retired", Money::from_cents(500)).inactive(),
        ]
        .into_iter()
        .collect();

        let notifier = InMemoryNotifier::new();
        let clock = ManualClock::default();
        let lifecycle = OrderLifecycle::new(store.clone(), Arc::new(catalog), Arc::new(notifier.clone()))
            .with_clock(Arc::new(clock.clone()));

        Fixture {
            lifecycle,
            store,
            notifier,
            clock,
        }
    }

    fn request(items: Vec<OrderItemRequest>, payment: PaymentDeclaration) -> CreateOrderRequest {
        CreateOrderRequest {
            customer: CustomerInfo {
                name: "Ada".to_string(),
                email: "Ada@Example.com".to_string(),
                phone: "555-0100".to_string(),
            },
            shipping_address: Address {
                line1: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                postal_code: "12345".to_string(),
                country: "US".to_string(),
                ..Default::default()
            },
            billing_address: None,
            items,
            payment,
        }
    }

    fn reference() -> PaymentDeclaration {
        PaymentDeclaration::ThirdPartyReference {
            reference_number: "REF-1".to_string(),
            payer_name: "Ada".to_string(),
            amount: Money::from_cents(5000),
        }
    }

    async fn quantity(store: &InMemoryStore, key: InventoryKey) -> i64 {
        store.get_inventory(&key).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_create_prices_variant_lines() {
        let f = fixture().await;
        let order = f
            .lifecycle
            .create_order(request(
                vec![
                    OrderItemRequest::new("mug", 2),
                    OrderItemRequest::new("shirt", 1).with_variant("size", "XL"),
                ],
                reference(),
            ))
            .await
            .unwrap();

        // 2 * 12.00 + 23.00 = 47.00, flat shipping, 8% tax
        assert_eq!(order.pricing().subtotal, Money::from_cents(4700));
        assert_eq!(order.pricing().shipping, Money::from_cents(1000));
        assert_eq!(order.pricing().tax, Money::from_cents(376));
        assert_eq!(order.pricing().total, Money::from_cents(6076));
        assert_eq!(order.items()[1].unit_price, Money::from_cents(2300));
        assert_eq!(order.billing_address(), order.shipping_address());
        assert_eq!(order.status(), OrderStatus::PaymentPending);
        assert_eq!(order.expires_at(), Some(f.clock.now() + Duration::hours(72)));

        assert_eq!(quantity(&f.store, InventoryKey::product("mug")).await, 8);
        assert_eq!(
            quantity(&f.store, InventoryKey::variant("shirt", "size:XL")).await,
            2
        );
        assert_eq!(
            f.notifier.kinds_for(order.id()),
            vec![NotificationKind::NewOrder]
        );
    }

    #[tokio::test]
    async fn test_direct_transfer_uses_shorter_window() {
        let f = fixture().await;
        let order = f
            .lifecycle
            .create_order(request(
                vec![OrderItemRequest::new("mug", 1)],
                PaymentDeclaration::DirectTransfer {
                    confirmation_code: "TX-77".to_string(),
                },
            ))
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::PendingConfirmation);
        assert_eq!(order.expires_at(), Some(f.clock.now() + Duration::hours(48)));
        assert_eq!(
            f.notifier.kinds_for(order.id()),
            vec![
                NotificationKind::NewOrder,
                NotificationKind::PaymentConfirmationRequested
            ]
        );
    }

    #[tokio::test]
    async fn test_inactive_or_unknown_products_leave_stock_untouched() {
        let f = fixture().await;

        for item in [
            OrderItemRequest::new("retired", 1),
            OrderItemRequest::new("ghost", 1),
            OrderItemRequest::new("shirt", 1).with_variant("size", "XS"),
        ] {
            let result = f
                .lifecycle
                .create_order(request(vec![OrderItemRequest::new("mug", 1), item], reference()))
                .await;
            assert!(matches!(result, Err(DomainError::ProductUnavailable { .. })));
        }

        assert_eq!(quantity(&f.store, InventoryKey::product("mug")).await, 10);
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_validation_failure_has_validation_kind() {
        let f = fixture().await;
        let mut bad = request(vec![OrderItemRequest::new("mug", 1)], reference());
        bad.customer.email = "nope".to_string();

        let err = f.lifecycle.create_order(bad).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert_eq!(quantity(&f.store, InventoryKey::product("mug")).await, 10);
    }

    #[tokio::test]
    async fn test_failed_insert_releases_reservation() {
        let f = fixture().await;
        f.store.set_fail_on_insert(true).await;

        let result = f
            .lifecycle
            .create_order(request(vec![OrderItemRequest::new("mug", 4)], reference()))
            .await;

        assert!(matches!(result, Err(DomainError::Store(StoreError::Unavailable(_)))));
        assert_eq!(quantity(&f.store, InventoryKey::product("mug")).await, 10);
        assert!(f.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_operation() {
        let f = fixture().await;
        f.notifier.set_fail(true);

        let order = f
            .lifecycle
            .create_order(request(vec![OrderItemRequest::new("mug", 1)], reference()))
            .await
            .unwrap();

        assert_eq!(f.store.order_count().await, 1);
        assert_eq!(order.status(), OrderStatus::PaymentPending);
    }

    #[tokio::test]
    async fn test_update_status_to_cancelled_restores_stock() {
        let f = fixture().await;
        let order = f
            .lifecycle
            .create_order(request(vec![OrderItemRequest::new("mug", 3)], reference()))
            .await
            .unwrap();
        f.lifecycle
            .confirm_payment(order.id(), Actor::admin("admin-1"), None)
            .await
            .unwrap();

        let cancelled = f
            .lifecycle
            .update_status(
                order.id(),
                StatusUpdate::new(OrderStatus::Cancelled).with_message("customer called"),
                Actor::admin("admin-1"),
            )
            .await
            .unwrap();

        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(cancelled.cancellation().unwrap().reason, "customer called");
        assert_eq!(quantity(&f.store, InventoryKey::product("mug")).await, 10);
    }

    #[tokio::test]
    async fn test_failed_cancel_save_takes_stock_back() {
        let f = fixture().await;
        let order = f
            .lifecycle
            .create_order(request(vec![OrderItemRequest::new("mug", 3)], reference()))
            .await
            .unwrap();
        f.store.set_fail_on_update(order.id(), true).await;

        let result = f
            .lifecycle
            .cancel_order(order.id(), "changed mind", Actor::Customer)
            .await;

        assert!(result.is_err());
        assert_eq!(quantity(&f.store, InventoryKey::product("mug")).await, 7);
        let stored = f.lifecycle.get_order(order.id()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::PaymentPending);
    }

    #[tokio::test]
    async fn test_expire_order_requires_elapsed_deadline() {
        let f = fixture().await;
        let order = f
            .lifecycle
            .create_order(request(vec![OrderItemRequest::new("mug", 1)], reference()))
            .await
            .unwrap();

        let early = f.lifecycle.expire_order(order.id()).await;
        assert!(matches!(
            early,
            Err(DomainError::Order(OrderError::NotExpired { .. }))
        ));

        f.clock.advance(Duration::hours(72));
        let expired = f.lifecycle.expire_order(order.id()).await.unwrap();
        assert_eq!(expired.status(), OrderStatus::Cancelled);
        assert_eq!(expired.cancellation().unwrap().actor, Actor::System);
        assert_eq!(expired.cancellation().unwrap().reason, EXPIRED_REASON);
    }

    #[tokio::test]
    async fn test_track_order_checks_email() {
        let f = fixture().await;
        let order = f
            .lifecycle
            .create_order(request(vec![OrderItemRequest::new("mug", 1)], reference()))
            .await
            .unwrap();

        let found = f
            .lifecycle
            .track_order(order.order_number(), Some("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(found.id(), order.id());

        assert!(f.lifecycle.track_order(order.order_number(), None).await.is_ok());
        assert!(matches!(
            f.lifecycle
                .track_order(order.order_number(), Some("eve@example.com"))
                .await,
            Err(DomainError::OrderNotFound(_))
        ));
        assert!(matches!(
            f.lifecycle.track_order("ORD-000000-000000", None).await,
            Err(DomainError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_extend_expiration_moves_deadline() {
        let f = fixture().await;
        let order = f
            .lifecycle
            .create_order(request(vec![OrderItemRequest::new("mug", 1)], reference()))
            .await
            .unwrap();
        let deadline = order.expires_at().unwrap();

        let extended = f
            .lifecycle
            .extend_expiration(order.id(), 24, Actor::admin("admin-1"))
            .await
            .unwrap();

        assert_eq!(extended.expires_at(), Some(deadline + Duration::hours(24)));
        assert_eq!(extended.extension_count(), 1);
        assert!(
            f.notifier
                .kinds_for(order.id())
                .contains(&NotificationKind::OrderExpirationExtended)
        );

        let err = f
            .lifecycle
            .extend_expiration(order.id(), 1000, Actor::admin("admin-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }
}
