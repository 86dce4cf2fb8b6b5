//! HTTP route handlers.

pub mod admin;
pub mod ops;
pub mod orders;

use axum::http::HeaderMap;
use domain::Actor;
use store::OrderId;

use crate::error::ApiError;

/// Header carrying the admin identity set by the upstream auth layer.
pub const ADMIN_HEADER: &str = "x-admin-id";

/// Admin identity of the caller, if any.
pub(crate) fn admin_actor(headers: &HeaderMap) -> Option<Actor> {
    headers
        .get(ADMIN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(Actor::admin)
}

pub(crate) fn require_admin(headers: &HeaderMap) -> Result<Actor, ApiError> {
    admin_actor(headers).ok_or(ApiError::Unauthorized)
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
