//! Admin-only endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use sweeper::SweepReport;

use super::orders::OrderResponse;
use super::{parse_order_id, require_admin};
use crate::error::ApiError;
use crate::{AppState, OrderBackend};

#[derive(Deserialize)]
pub struct ExtendRequest {
    pub hours: u32,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub examined: usize,
    pub expired: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            examined: report.examined,
            expired: report.expired,
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}

/// POST /admin/orders/{id}/extend: push an unpaid order's deadline back.
#[tracing::instrument(skip(state, headers, req))]
pub async fn extend_expiration<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ExtendRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_admin(&headers)?;
    let order = state
        .lifecycle
        .extend_expiration(parse_order_id(&id)?, req.hours, actor)
        .await?;
    Ok(Json(order.into()))
}

/// POST /admin/sweep: run one expiration sweep now.
#[tracing::instrument(skip(state, headers))]
pub async fn sweep<S: OrderBackend>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, ApiError> {
    let admin = require_admin(&headers)?;
    tracing::info!(%admin, "manual sweep requested");

    let report = state.sweeper.sweep_once().await?;
    Ok(Json(report.into()))
}
