//! Checkout endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use clients::propagation::{self, HeaderExtractor};
use common::PlaceOrderRequest;
use opentelemetry::Context;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::AppState;
use crate::error::ApiError;

/// POST /api/v1/checkout/{cartId}: places an order for the cart.
///
/// Returns 201 with an empty body. A `traceparent` header on the request
/// becomes the parent of the request span; otherwise the span starts a new
/// trace.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Path(cart_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: PlaceOrderRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "failed to parse order request body");
        ApiError::BadRequest(e.to_string())
    })?;

    let cart_id: i64 = cart_id.parse().map_err(|_| {
        tracing::error!(%cart_id, "failed to parse cart id");
        ApiError::BadRequest(format!("invalid cart id: {cart_id}"))
    })?;

    let parent = propagation::extract(&HeaderExtractor(&headers)).unwrap_or_else(Context::new);
    let span = tracing::info_span!("checkout_request", cart_id);
    span.set_parent(parent.clone());
    let cx = propagation::outbound_context(&span, &parent);

    state
        .checkout
        .place_order(cx, cart_id, Some(&request))
        .instrument(span)
        .await
        .inspect_err(|e| tracing::error!(cart_id, error = %e, "failed to place order"))?;

    Ok(StatusCode::CREATED)
}
