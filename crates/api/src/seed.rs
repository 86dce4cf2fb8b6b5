//! Catalog and stock seeding from a JSON file.
//!
//! ```json
//! {
//!   "products": [
//!     { "id": "mug", "name": "Mug", "price": 1200,
//!       "variants": [{ "name": "color", "value": "red", "price_adjustment": 0 }] }
//!   ],
//!   "inventory": [
//!     { "product_id": "mug", "variant": "color:red", "quantity": 25 }
//!   ]
//! }
//! ```

use std::path::Path;

use domain::{CatalogProduct, InMemoryCatalog};
use serde::Deserialize;
use store::{InventoryKey, InventoryRecord, InventoryStore, ProductId, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to write inventory: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
    #[serde(default)]
    pub inventory: Vec<SeedStock>,
}

/// Stock line of a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedStock {
    pub product_id: ProductId,

    /// `"name:value"` selector, or absent for the base product.
    #[serde(default)]
    pub variant: Option<String>,

    #[serde(default)]
    pub quantity: i64,

    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    #[serde(default = "default_track_quantity")]
    pub track_quantity: bool,

    #[serde(default)]
    pub allow_backorder: bool,
}

fn default_low_stock_threshold() -> i64 {
    5
}

fn default_track_quantity() -> bool {
    true
}

impl SeedStock {
    fn into_record(self) -> InventoryRecord {
        let key = InventoryKey {
            product_id: self.product_id,
            variant: self.variant,
        };
        if self.track_quantity {
            InventoryRecord::tracked(key, self.quantity, self.low_stock_threshold)
                .with_backorder(self.allow_backorder)
        } else {
            InventoryRecord::untracked(key)
        }
    }
}

impl Seed {
    pub fn parse(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::parse(&json)
    }

    /// Adds the products to `catalog` and writes the stock records to `store`.
    pub async fn apply<S: InventoryStore>(
        self,
        catalog: &InMemoryCatalog,
        store: &S,
    ) -> Result<(), SeedError> {
        let products = self.products.len();
        let records = self.inventory.len();

        for product in self.products {
            catalog.insert(product);
        }
        for stock in self.inventory {
            store.put_inventory(stock.into_record()).await?;
        }

        tracing::info!(products, records, "catalog seeded");
        Ok(())
    }
}
