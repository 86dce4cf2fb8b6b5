//! Lifecycle engine configuration.

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::order::{Money, OrderError, PaymentMethod, Pricing};

/// Shipping and tax rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Shipping is free when the subtotal is strictly above this amount.
    pub free_shipping_threshold: Money,

    /// Shipping charged otherwise.
    pub flat_shipping_fee: Money,

    /// Tax rate in basis points (800 = 8%).
    pub tax_rate_bps: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::from_dollars(100),
            flat_shipping_fee: Money::from_dollars(10),
            tax_rate_bps: 800,
        }
    }
}

impl PricingPolicy {
    /// Prices an order with the given subtotal.
    pub fn price(&self, subtotal: Money) -> Result<Pricing, OrderError> {
        let shipping = if subtotal > self.free_shipping_threshold {
            Money::zero()
        } else {
            self.flat_shipping_fee
        };
        let tax = subtotal.checked_basis_points(self.tax_rate_bps);
        let total = tax.and_then(|tax| subtotal.checked_add(shipping)?.checked_add(tax));

        match (tax, total) {
            (Some(tax), Some(_)) => Ok(Pricing::new(subtotal, shipping, tax, Money::zero())),
            _ => Err(OrderError::ValidationFailed {
                field: "pricing.total".to_string(),
                reason: "amount out of range",
            }),
        }
    }
}

/// How long an unpaid order holds its stock, per payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentWindows {
    pub third_party_reference_hours: u32,
    pub direct_transfer_hours: u32,
}

impl Default for PaymentWindows {
    fn default() -> Self {
        Self {
            third_party_reference_hours: 72,
            direct_transfer_hours: 48,
        }
    }
}

impl PaymentWindows {
    pub fn window_for(&self, method: PaymentMethod) -> Duration {
        let hours = match method {
            PaymentMethod::ThirdPartyReference => self.third_party_reference_hours,
            PaymentMethod::DirectTransfer => self.direct_transfer_hours,
        };
        Duration::hours(i64::from(hours))
    }
}

/// Configuration for [`OrderLifecycle`](crate::OrderLifecycle).
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub pricing: PricingPolicy,
    pub payment_windows: PaymentWindows,

    /// Upper bound on each store or catalog call.
    pub store_timeout: StdDuration,

    /// Largest single deadline extension an admin may grant.
    pub max_extension_hours: u32,

    /// Retries after losing a compare-and-swap to another writer.
    pub conflict_retries: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            payment_windows: PaymentWindows::default(),
            store_timeout: StdDuration::from_secs(5),
            max_extension_hours: 168,
            conflict_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_shipping_at_threshold() {
        let pricing = PricingPolicy::default()
            .price(Money::from_dollars(100))
            .unwrap();

        assert_eq!(pricing.shipping, Money::from_dollars(10));
        assert_eq!(pricing.tax, Money::from_dollars(8));
        assert_eq!(pricing.total, Money::from_dollars(118));
    }

    #[test]
    fn test_free_shipping_above_threshold() {
        let pricing = PricingPolicy::default()
            .price(Money::from_cents(10_001))
            .unwrap();

        assert_eq!(pricing.shipping, Money::zero());
        assert_eq!(pricing.tax, Money::from_cents(800));
        assert_eq!(pricing.total, Money::from_cents(10_801));
        assert!(pricing.is_consistent());
    }

    #[test]
    fn test_pricing_overflow_is_rejected() {
        let err = PricingPolicy::default()
            .price(Money::from_cents(i64::MAX - 10))
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::ValidationFailed { ref field, .. } if field == "pricing.total"
        ));
    }

    #[test]
    fn test_payment_windows() {
        let windows = PaymentWindows::default();
        assert_eq!(
            windows.window_for(PaymentMethod::ThirdPartyReference),
            Duration::hours(72)
        );
        assert_eq!(
            windows.window_for(PaymentMethod::DirectTransfer),
            Duration::hours(48)
        );
    }
}
