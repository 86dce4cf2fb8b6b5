//! Persistence for order documents and the inventory ledger.
//!
//! Orders are stored as versioned JSON documents next to a few indexed
//! columns (order number, status, expiration). Every update is a
//! compare-and-swap on the version so a writer that read stale state is
//! rejected instead of overwriting a newer transition.
//!
//! Inventory records are mutated only through single-step conditional
//! updates, so two reservations racing for the last unit cannot both win.

pub mod error;
pub mod inventory;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod version;

pub use common::{OrderId, ProductId, StockStatus};
pub use error::{Result, StoreError};
pub use inventory::{InventoryKey, InventoryRecord, InventoryStore};
pub use memory::InMemoryStore;
pub use order::{ExpirationQuery, OrderRecord, OrderStore};
pub use postgres::PostgresStore;
pub use version::Version;
