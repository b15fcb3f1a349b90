//! HTTP surface of the checkout service.
//!
//! Exposes the checkout endpoint plus health and Prometheus metrics, with
//! request tracing from `tower-http`.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::CheckoutService;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
}

impl AppState {
    pub fn new(checkout: CheckoutService) -> Self {
        Self { checkout }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/v1/checkout/{cartId}",
            post(routes::checkout::place_order),
        )
        .with_state(state)
        .merge(metrics_router)
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
}
