//! Checkout façade used by the HTTP layer.

use std::sync::Arc;

use clients::propagation;
use common::PlaceOrderRequest;
use opentelemetry::Context;

use crate::context::OrderContext;
use crate::error::CheckoutError;
use crate::orchestrator::{CheckoutReceipt, OrderPlacer};

/// Entry point for placing orders.
///
/// Validates that a request is present, lifts the postal code into an
/// [`OrderContext`] and hands off to the orchestrator. Errors are returned
/// unchanged.
#[derive(Clone)]
pub struct CheckoutService {
    placer: Arc<dyn OrderPlacer>,
}

impl CheckoutService {
    pub fn new(placer: Arc<dyn OrderPlacer>) -> Self {
        Self { placer }
    }

    #[tracing::instrument(skip(self, trace, request), fields(trace_id = %propagation::trace_id(&trace)))]
    pub async fn place_order(
        &self,
        trace: Context,
        cart_id: i64,
        request: Option<&PlaceOrderRequest>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let request = request.ok_or_else(|| {
            tracing::warn!("checkout called without an order request");
            CheckoutError::InvalidRequest
        })?;

        let ctx = OrderContext::new(trace, request.address.postal_code.clone());
        self.placer.place_order(&ctx, cart_id).await
    }
}
