//! Order placement, tracking and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use domain::{
    Actor, Address, Aggregate, CreateOrderRequest, CustomerInfo, Money, Order, OrderItemRequest,
    OrderStatus, PaymentDeclaration, PaymentStatus, StatusUpdate, TimelineEntry, TrackingInfo,
};
use serde::{Deserialize, Serialize};

use super::{admin_actor, parse_order_id, require_admin};
use crate::error::ApiError;
use crate::{AppState, OrderBackend};

// -- Request types --

/// Order placed with a bare direct-transfer confirmation code.
#[derive(Deserialize)]
pub struct PlaceWithConfirmationRequest {
    pub customer: CustomerInfo,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub items: Vec<OrderItemRequest>,
    pub confirmation_code: String,
}

impl From<PlaceWithConfirmationRequest> for CreateOrderRequest {
    fn from(req: PlaceWithConfirmationRequest) -> Self {
        CreateOrderRequest {
            customer: req.customer,
            shipping_address: req.shipping_address,
            billing_address: req.billing_address,
            items: req.items,
            payment: PaymentDeclaration::DirectTransfer {
                confirmation_code: req.confirmation_code,
            },
        }
    }
}

#[derive(Deserialize)]
pub struct ConfirmPaymentRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct TrackQuery {
    pub email: Option<String>,
}

// -- Response types --

/// Full order view for the customer who placed it and for admins.
#[derive(Serialize)]
pub struct OrderResponse {
    pub version: i64,
    #[serde(flatten)]
    pub order: Order,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            version: order.version().as_i64(),
            order,
        }
    }
}

/// Public tracking view; leaves out contact details and addresses.
#[derive(Serialize)]
pub struct TrackingResponse {
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub items: Vec<TrackedItem>,
    pub total: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingInfo>,
    pub timeline: Vec<TimelineEntry>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct TrackedItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub quantity: u32,
}

impl From<&Order> for TrackingResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number().to_string(),
            status: order.status(),
            payment_status: order.payment().status,
            items: order
                .items()
                .iter()
                .map(|item| TrackedItem {
                    name: item.snapshot.name.clone(),
                    variant: item.variant.as_ref().map(|v| v.key()),
                    quantity: item.quantity,
                })
                .collect(),
            total: order.pricing().total,
            expires_at: order.expires_at(),
            tracking: order.tracking().cloned(),
            timeline: order.timeline().to_vec(),
            created_at: order.created_at(),
        }
    }
}

// -- Handlers --

/// POST /orders: place an order paid by third-party reference.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.lifecycle.create_order(req).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// POST /orders/place-with-confirmation: place an order with a transfer code.
#[tracing::instrument(skip(state, req))]
pub async fn place_with_confirmation<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceWithConfirmationRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.lifecycle.create_order(req.into()).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.lifecycle.get_order(parse_order_id(&id)?).await?;
    Ok(Json(order.into()))
}

/// GET /orders/track/{order_number}?email=
#[tracing::instrument(skip(state, query))]
pub async fn track<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_number): Path<String>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<TrackingResponse>, ApiError> {
    let order = state
        .lifecycle
        .track_order(&order_number, query.email.as_deref())
        .await?;
    Ok(Json(TrackingResponse::from(&order)))
}

/// PATCH /orders/{id}/confirm-payment: admin only.
#[tracing::instrument(skip(state, headers, req))]
pub async fn confirm_payment<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_admin(&headers)?;
    let order = state
        .lifecycle
        .confirm_payment(parse_order_id(&id)?, actor, req.notes)
        .await?;
    Ok(Json(order.into()))
}

/// PATCH /orders/{id}/status: admin only.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update_status<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_admin(&headers)?;
    let order = state
        .lifecycle
        .update_status(parse_order_id(&id)?, req, actor)
        .await?;
    Ok(Json(order.into()))
}

/// PATCH /orders/{id}/cancel: recorded as the admin when the header is set,
/// otherwise as the customer.
#[tracing::instrument(skip(state, headers, req))]
pub async fn cancel<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CancelRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = admin_actor(&headers).unwrap_or(Actor::Customer);
    let order = state
        .lifecycle
        .cancel_order(parse_order_id(&id)?, req.reason, actor)
        .await?;
    Ok(Json(order.into()))
}
