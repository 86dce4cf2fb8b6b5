//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use sweeper::SweepError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// The body is always `{"error": <message>, "kind": <kind>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error, mapped by its kind.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Malformed path or body.
    #[error("{0}")]
    BadRequest(String),

    /// Admin endpoint called without an admin identity.
    #[error("Admin identity required")]
    Unauthorized,

    /// Sweep run failed.
    #[error(transparent)]
    Sweep(#[from] SweepError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Domain(err) => {
                let kind = err.kind();
                let status = match kind {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, kind.as_str())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorKind::Validation.as_str()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Sweep(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal.as_str(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        } else {
            tracing::debug!(error = %message, %status, "request rejected");
        }

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::OrderError;
    use store::StoreError;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_domain_kinds_map_to_status_codes() {
        assert_eq!(
            status_of(DomainError::Order(OrderError::NoItems)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::OrderNotFound("ORD-1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::Order(OrderError::AlreadyCancelled)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Store(StoreError::Unavailable("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_admin_is_unauthorized() {
        assert_eq!(status_of(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
    }
}
