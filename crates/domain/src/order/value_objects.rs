//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{InventoryKey, ProductId};

use super::{OrderError, OrderStatus};

/// Money amount represented in cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a dollar value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.cents.checked_mul(i64::from(quantity)).map(Money::from_cents)
    }

    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Returns `rate_bps` basis points of this amount, rounded half-up to the
    /// cent, or `None` on overflow.
    pub fn checked_basis_points(&self, rate_bps: u32) -> Option<Money> {
        let scaled = self.cents.checked_mul(i64::from(rate_bps))?.checked_add(5_000)?;
        Some(Money::from_cents(scaled.div_euclid(10_000)))
    }

    /// Sums amounts, or `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

fn require(value: &str, field: impl Into<String>) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::ValidationFailed {
            field: field.into(),
            reason: "must not be empty",
        });
    }
    Ok(())
}

/// Who performed an action on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Actor {
    /// The customer who placed the order.
    Customer,

    /// An administrator, by ID.
    Admin(String),

    /// Background processing such as the expiration sweeper.
    System,
}

impl Actor {
    /// Creates an admin actor.
    pub fn admin(id: impl Into<String>) -> Self {
        Actor::Admin(id.into())
    }

    /// Returns the actor category without the ID.
    pub fn label(&self) -> &'static str {
        match self {
            Actor::Customer => "customer",
            Actor::Admin(_) => "admin",
            Actor::System => "system",
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Admin(id) => write!(f, "admin:{id}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Customer contact details captured when the order is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerInfo {
    pub fn validate(&self) -> Result<(), OrderError> {
        require(&self.name, "customer.name")?;
        require(&self.phone, "customer.phone")?;

        let valid_email = self
            .email
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            });
        if !valid_email {
            return Err(OrderError::ValidationFailed {
                field: "customer.email".to_string(),
                reason: "must be a valid email address",
            });
        }
        Ok(())
    }
}

/// A shipping or billing address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Checks required fields; `prefix` names the address in errors.
    pub fn validate(&self, prefix: &str) -> Result<(), OrderError> {
        require(&self.line1, format!("{prefix}.line1"))?;
        require(&self.city, format!("{prefix}.city"))?;
        require(&self.postal_code, format!("{prefix}.postal_code"))?;
        require(&self.country, format!("{prefix}.country"))
    }
}

/// A selected product option, e.g. size M.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantSelector {
    pub name: String,
    pub value: String,
}

impl VariantSelector {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Inventory key component, `"name:value"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.name, self.value)
    }
}

/// Catalog data copied into the order so later catalog edits don't alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub base_price: Money,
}

/// One product (optionally one variant) with quantity within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub snapshot: ProductSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelector>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl LineItem {
    /// Creates a line item, computing its total.
    ///
    /// Fails if the total does not fit in [`Money`].
    pub fn new(
        product_id: impl Into<ProductId>,
        snapshot: ProductSnapshot,
        variant: Option<VariantSelector>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, OrderError> {
        let product_id = product_id.into();
        let line_total = unit_price.checked_mul(quantity).ok_or_else(|| {
            OrderError::ValidationFailed {
                field: format!("items.{product_id}.quantity"),
                reason: "line total out of range",
            }
        })?;

        Ok(Self {
            product_id,
            snapshot,
            variant,
            quantity,
            unit_price,
            line_total,
        })
    }

    /// The inventory record this line reserves from.
    pub fn inventory_key(&self) -> InventoryKey {
        InventoryKey {
            product_id: self.product_id.clone(),
            variant: self.variant.as_ref().map(VariantSelector::key),
        }
    }
}

/// Pricing breakdown of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl Pricing {
    /// Builds a breakdown with `total = subtotal + shipping + tax - discount`.
    pub fn new(subtotal: Money, shipping: Money, tax: Money, discount: Money) -> Self {
        Self {
            subtotal,
            shipping,
            tax,
            discount,
            total: subtotal + shipping + tax - discount,
        }
    }

    /// Returns true if every component is non-negative and the total adds up.
    pub fn is_consistent(&self) -> bool {
        ![self.subtotal, self.shipping, self.tax, self.discount, self.total]
            .iter()
            .any(Money::is_negative)
            && self.total == self.subtotal + self.shipping + self.tax - self.discount
    }
}

/// How the customer declares payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// A structured confirmation number from a third-party payment provider.
    #[default]
    ThirdPartyReference,

    /// A bare confirmation code an administrator verifies by hand.
    DirectTransfer,
}

impl PaymentMethod {
    /// Status a new order paid this way starts in.
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            PaymentMethod::ThirdPartyReference => OrderStatus::PaymentPending,
            PaymentMethod::DirectTransfer => OrderStatus::PendingConfirmation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::ThirdPartyReference => "third-party-reference",
            PaymentMethod::DirectTransfer => "direct-transfer",
        }
    }
}

/// Payment information submitted with a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum PaymentDeclaration {
    ThirdPartyReference {
        reference_number: String,
        payer_name: String,
        amount: Money,
    },
    DirectTransfer {
        confirmation_code: String,
    },
}

impl PaymentDeclaration {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDeclaration::ThirdPartyReference { .. } => PaymentMethod::ThirdPartyReference,
            PaymentDeclaration::DirectTransfer { .. } => PaymentMethod::DirectTransfer,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        match self {
            PaymentDeclaration::ThirdPartyReference {
                reference_number,
                payer_name,
                amount,
            } => {
                require(reference_number, "payment.reference_number")?;
                require(payer_name, "payment.payer_name")?;
                if !amount.is_positive() {
                    return Err(OrderError::ValidationFailed {
                        field: "payment.amount".to_string(),
                        reason: "must be positive",
                    });
                }
                Ok(())
            }
            PaymentDeclaration::DirectTransfer { confirmation_code } => {
                require(confirmation_code, "payment.confirmation_code")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    PendingConfirmation,
    Confirmed,
    Failed,
    Refunded,
}

/// Payment sub-record of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub method: PaymentMethod,
    pub status: PaymentStatus,

    /// Reference number or confirmation code supplied by the customer.
    pub confirmation_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&PaymentDeclaration> for PaymentRecord {
    fn from(declaration: &PaymentDeclaration) -> Self {
        match declaration {
            PaymentDeclaration::ThirdPartyReference {
                reference_number,
                payer_name,
                amount,
            } => PaymentRecord {
                method: PaymentMethod::ThirdPartyReference,
                status: PaymentStatus::Pending,
                confirmation_id: reference_number.clone(),
                payer_name: Some(payer_name.clone()),
                declared_amount: Some(*amount),
                ..Default::default()
            },
            PaymentDeclaration::DirectTransfer { confirmation_code } => PaymentRecord {
                method: PaymentMethod::DirectTransfer,
                status: PaymentStatus::PendingConfirmation,
                confirmation_id: confirmation_code.clone(),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub tracking_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

/// Populated only when an order is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub actor: Actor,
    pub cancelled_at: DateTime<Utc>,
    pub refund_issued: bool,
}

/// One entry of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
}
