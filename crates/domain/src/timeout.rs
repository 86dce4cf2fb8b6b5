//! Time-bounded store calls.

use std::future::Future;
use std::time::Duration;

use crate::error::DomainError;

/// Runs `call`, failing with [`DomainError::Timeout`] if it takes longer than `limit`.
pub(crate) async fn bounded<T, E>(
    limit: Duration,
    operation: &'static str,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, DomainError>
where
    DomainError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(DomainError::from),
        Err(_) => {
            tracing::warn!(operation, ?limit, "store call timed out");
            Err(DomainError::Timeout(operation))
        }
    }
}
