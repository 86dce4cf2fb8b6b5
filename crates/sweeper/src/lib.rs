//! Expiration sweeper for unpaid orders.
//!
//! The sweeper periodically asks the lifecycle engine for orders whose
//! payment deadline has passed and expires each one through the same
//! cancellation path a manual cancel takes. Each order is an independent
//! unit: a failure is logged and counted, and the rest of the batch goes on.

pub mod error;
pub mod sweeper;

pub use error::{Result, SweepError};
pub use sweeper::{ExpirationSweeper, SweepReport, SweeperConfig, SweeperHandle};
