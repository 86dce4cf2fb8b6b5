//! Domain layer for the order backend.
//!
//! This crate provides:
//! - the [`Order`] aggregate with its status state machine and timeline
//! - the [`InventoryLedger`] for atomic stock reservation and release
//! - the [`OrderLifecycle`] engine that coordinates both under per-order locks
//! - the [`Notifier`] and [`ProductCatalog`] seams to neighbouring subsystems

pub mod aggregate;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod lock;
pub mod notify;
pub mod order;
pub mod repository;
mod timeout;

pub use aggregate::{Aggregate, DomainEvent};
pub use catalog::{CatalogProduct, CatalogVariant, InMemoryCatalog, ProductCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LifecycleConfig, PaymentWindows, PricingPolicy};
pub use error::{DomainError, ErrorKind};
pub use inventory::{InventoryLedger, Reservation, recompute_stock_status};
pub use lifecycle::{EXPIRED_REASON, OrderLifecycle};
pub use lock::{OrderLockGuard, OrderLocks};
pub use notify::{
    BroadcastNotifier, InMemoryNotifier, Notification, NotificationKind, Notifier, NotifyError,
};
pub use order::{
    Actor, Address, Cancellation, CreateOrderRequest, CustomerInfo, LineItem,
    MAX_LINE_QUANTITY, Money, Order, OrderError, OrderEvent, OrderItemRequest,
    OrderNumberGenerator, OrderStatus, PaymentDeclaration, PaymentMethod, PaymentRecord,
    PaymentStatus, Pricing, ProductSnapshot, StatusUpdate, TimelineEntry, TrackingInfo,
    VariantSelector,
};
pub use repository::OrderRepository;
