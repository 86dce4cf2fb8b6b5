//! Identifiers and stock rules shared by the store, domain and api crates.

pub mod stock;
pub mod types;

pub use stock::{StockStatus, recompute_stock_status};
pub use types::{OrderId, ProductId};
