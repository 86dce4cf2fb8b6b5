//! Sweeper error types.

use domain::DomainError;
use thiserror::Error;

/// Errors that abort a sweep run.
///
/// Failures on individual orders never surface here; they are counted in the
/// [`SweepReport`](crate::SweepReport).
#[derive(Debug, Error)]
pub enum SweepError {
    /// The expiration index could not be queried.
    #[error("Failed to query expired orders: {0}")]
    Query(#[source] DomainError),

    /// The background task panicked or was aborted.
    #[error("Sweeper task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for sweeper operations.
pub type Result<T> = std::result::Result<T, SweepError>;
