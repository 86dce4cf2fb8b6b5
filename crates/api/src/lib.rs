//! HTTP API server with observability for the order backend.
//!
//! Provides REST endpoints for placing, tracking and administering orders,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::OrderLifecycle;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InventoryStore, OrderStore};
use sweeper::{ExpirationSweeper, SweeperConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Storage the server can run on.
pub trait OrderBackend: OrderStore + InventoryStore + Clone + 'static {}

impl<T> OrderBackend for T where T: OrderStore + InventoryStore + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub lifecycle: Arc<OrderLifecycle<S>>,
    pub sweeper: Arc<ExpirationSweeper<S>>,
}

impl<S: OrderBackend> AppState<S> {
    pub fn new(lifecycle: Arc<OrderLifecycle<S>>, sweeper_config: SweeperConfig) -> Self {
        let sweeper = Arc::new(ExpirationSweeper::new(lifecycle.clone(), sweeper_config));
        Self { lifecycle, sweeper }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderBackend>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route("/orders", post(routes::orders::create::<S>))
        .route(
            "/orders/place-with-confirmation",
            post(routes::orders::place_with_confirmation::<S>),
        )
        .route(
            "/orders/track/{order_number}",
            get(routes::orders::track::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{id}/confirm-payment",
            patch(routes::orders::confirm_payment::<S>),
        )
        .route("/orders/{id}/status", patch(routes::orders::update_status::<S>))
        .route("/orders/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route(
            "/admin/orders/{id}/extend",
            post(routes::admin::extend_expiration::<S>),
        )
        .route("/admin/sweep", post(routes::admin::sweep::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
