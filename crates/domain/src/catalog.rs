//! Read access to the product catalog.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use store::ProductId;

use crate::error::DomainError;
use crate::order::{Money, ProductSnapshot, VariantSelector};

/// A purchasable option of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub name: String,
    pub value: String,

    /// Added to the product's base price.
    #[serde(default)]
    pub price_adjustment: Money,

    #[serde(default)]
    pub sku: Option<String>,
}

impl CatalogVariant {
    pub fn matches(&self, selector: &VariantSelector) -> bool {
        self.name == selector.name && self.value == selector.value
    }
}

/// Product data the order engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub price: Money,
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[serde(default)]
    pub variants: Vec<CatalogVariant>,
}

fn active_by_default() -> bool {
    true
}

impl CatalogProduct {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sku: None,
            image: None,
            price,
            active: true,
            variants: Vec::new(),
        }
    }

    pub fn with_variant(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        price_adjustment: Money,
    ) -> Self {
        self.variants.push(CatalogVariant {
            name: name.into(),
            value: value.into(),
            price_adjustment,
            sku: None,
        });
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn variant(&self, selector: &VariantSelector) -> Option<&CatalogVariant> {
        self.variants.iter().find(|v| v.matches(selector))
    }

    /// Snapshot copied into a line item. A variant SKU wins over the product's.
    pub fn snapshot(&self, variant: Option<&CatalogVariant>) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            sku: variant
                .and_then(|v| v.sku.clone())
                .or_else(|| self.sku.clone()),
            image: self.image.clone(),
            base_price: self.price,
        }
    }
}

/// The product catalog, owned by another subsystem.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, DomainError>;
}

/// Catalog held in memory; used for tests and seeded deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, CatalogProduct>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: CatalogProduct) {
        self.products.write().insert(product.id.clone(), product);
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }
}

impl FromIterator<CatalogProduct> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = CatalogProduct>>(iter: I) -> Self {
        let catalog = InMemoryCatalog::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, DomainError> {
        Ok(self.products.read().get(product_id).cloned())
    }
}
