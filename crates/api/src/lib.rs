//! HTTP API for the checkout backend.
//!
//! Provides REST endpoints for order placement, payment callbacks, gateway
//! webhooks and order status, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::PaymentGateway;
use ledger::{CatalogStore, OrderLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", get(routes::orders::list::<S, G>))
        .route("/orders/create", post(routes::orders::create::<S, G>))
        .route(
            "/orders/verify-payment",
            post(routes::orders::verify_payment::<S, G>),
        )
        .route(
            "/orders/payment-failed",
            post(routes::orders::payment_failed::<S, G>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, G>))
        .route("/payments/webhook", post(routes::payments::webhook::<S, G>))
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
