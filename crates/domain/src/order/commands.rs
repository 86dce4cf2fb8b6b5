//! Order requests.

use serde::{Deserialize, Serialize};
use store::ProductId;

use super::{
    Address, CustomerInfo, OrderError, OrderStatus, PaymentDeclaration, TrackingInfo,
    VariantSelector,
};

/// Most units a single line may request.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub variant: Option<VariantSelector>,
}

impl OrderItemRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            variant: None,
        }
    }

    /// Selects a variant, e.g. `("size", "M")`.
    pub fn with_variant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variant = Some(VariantSelector::new(name, value));
        self
    }
}

/// Request to place a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer: CustomerInfo,
    pub shipping_address: Address,

    /// Defaults to the shipping address.
    #[serde(default)]
    pub billing_address: Option<Address>,

    pub items: Vec<OrderItemRequest>,
    pub payment: PaymentDeclaration,
}

impl CreateOrderRequest {
    /// Checks the request shape without touching the catalog or inventory.
    pub fn validate(&self) -> Result<(), OrderError> {
        self.customer.validate()?;
        self.shipping_address.validate("shipping_address")?;
        if let Some(billing) = &self.billing_address {
            billing.validate("billing_address")?;
        }

        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.to_string(),
                });
            }
            if item.quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::ValidationFailed {
                    field: format!("items.{}.quantity", item.product_id),
                    reason: "exceeds the per-line maximum of 10000",
                });
            }
            let blank_variant = item.variant.as_ref().is_some_and(|variant| {
                variant.name.trim().is_empty() || variant.value.trim().is_empty()
            });
            if blank_variant {
                return Err(OrderError::ValidationFailed {
                    field: format!("items.{}.variant", item.product_id),
                    reason: "must name an option and a value",
                });
            }
        }

        self.payment.validate()
    }

    /// Returns the billing address, falling back to shipping.
    pub fn billing_or_shipping(&self) -> Address {
        self.billing_address
            .clone()
            .unwrap_or_else(|| self.shipping_address.clone())
    }
}

/// Request to move an order to another status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tracking: Option<TrackingInfo>,
}

impl StatusUpdate {
    pub fn new(status: OrderStatus) -> Self {
        Self {
            status,
            message: None,
            tracking: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_tracking(mut self, tracking_number: impl Into<String>, carrier: Option<String>) -> Self {
        self.tracking = Some(TrackingInfo {
            tracking_number: tracking_number.into(),
            carrier,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Money;

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
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
            billing_address: None,
            items: vec![OrderItemRequest::new("widget", 1)],
            payment: PaymentDeclaration::ThirdPartyReference {
                reference_number: "REF-1".to_string(),
                payer_name: "Ada".to_string(),
                amount: Money::from_cents(100),
            },
        }
    }

    #[test]
    fn test_valid_request() {
        let request = request();
        assert!(request.validate().is_ok());
        assert_eq!(request.billing_or_shipping(), request.shipping_address);
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut request = request();
        request.items.clear();
        assert!(matches!(request.validate(), Err(OrderError::NoItems)));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut request = request();
        request.items.push(OrderItemRequest::new("gadget", 0));
        assert!(matches!(
            request.validate(),
            Err(OrderError::InvalidQuantity { ref product_id }) if product_id == "gadget"
        ));
    }

    #[test]
    fn test_oversized_quantity_rejected() {
        let mut request = request();
        request.items[0].quantity = MAX_LINE_QUANTITY;
        assert!(request.validate().is_ok());

        request.items[0].quantity = MAX_LINE_QUANTITY + 1;
        assert!(matches!(
            request.validate(),
            Err(OrderError::ValidationFailed { ref field, .. }) if field == "items.widget.quantity"
        ));
    }

    #[test]
    fn test_invalid_billing_address_rejected() {
        let mut request = request();
        request.billing_address = Some(Address::default());
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("billing_address.line1"));
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let json = serde_json::json!({
            "customer": {"name": "Ada", "email": "ada@example.com", "phone": "1"},
            "shipping_address": {"line1": "1 Main", "city": "X", "postal_code": "1", "country": "US"},
            "items": [{"product_id": "shirt", "quantity": 2, "variant": {"name": "size", "value": "M"}}],
            "payment": {"method": "direct-transfer", "confirmation_code": "TX-9"}
        });

        let request: CreateOrderRequest = serde_json::from_value(json).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.items[0].variant, Some(VariantSelector::new("size", "M")));
    }
}
