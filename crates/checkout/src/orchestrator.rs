//! Checkout saga orchestrator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clients::{CartRepository, CatalogRepository, MessagePublisher};
use common::Cart;
use thiserror::Error;

use crate::context::OrderContext;
use crate::error::CheckoutError;
use crate::instruments::CheckoutMetrics;
use crate::services::payment::PaymentGateway;
use crate::services::shipping::ShippingProvider;
use crate::state::CheckoutState;

/// Routing key for inventory update messages.
pub const INVENTORY_UPDATE_ROUTING_KEY: &str = "order.placed";

/// A price delta above this is logged as a margin loss. The order still goes
/// through.
pub const PRICE_DELTA_WARN_THRESHOLD: f64 = 5.0;

/// Default upper bound for a single payment, shipping or publish call. Cart
/// and catalog calls are bounded by their HTTP client's own timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub cart_id: i64,
    pub shipping_cost: f64,
    /// Cart total plus shipping.
    pub amount_charged: f64,
    pub payment_id: String,
    pub tracking_number: String,
    /// Inventory updates published, one per cart line.
    pub lines_published: usize,
    pub state: CheckoutState,
}

/// Places an order for a cart.
#[async_trait]
pub trait OrderPlacer: Send + Sync {
    async fn place_order(
        &self,
        ctx: &OrderContext,
        cart_id: i64,
    ) -> Result<CheckoutReceipt, CheckoutError>;
}

/// Why a single collaborator call did not produce a value.
#[derive(Debug, Error)]
enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Progress of one call through the pipeline.
#[derive(Debug, Default)]
struct Progress {
    state: CheckoutState,
    /// Amount sent to the payment gateway, meaningful once charged.
    amount: f64,
}

impl Progress {
    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            tracing::debug!(from = %self.state, to = %next, "checkout advanced");
            self.state = next;
        }
    }
}

/// Runs the checkout saga.
///
/// Steps run strictly in sequence: cart → per-line inventory → shipping cost →
/// charge → label → inventory updates. The first failing step aborts the
/// order with its error kind. Nothing is retried and nothing is compensated;
/// when a step after the charge fails, the charged amount is reported as
/// unreconciled.
pub struct CheckoutOrchestrator<C, K, P, S, B>
where
    C: CartRepository,
    K: CatalogRepository,
    P: PaymentGateway,
    S: ShippingProvider,
    B: MessagePublisher,
{
    cart: C,
    catalog: K,
    payment: P,
    shipping: S,
    publisher: B,
    metrics: Arc<dyn CheckoutMetrics>,
    step_timeout: Duration,
}

impl<C, K, P, S, B> CheckoutOrchestrator<C, K, P, S, B>
where
    C: CartRepository,
    K: CatalogRepository,
    P: PaymentGateway,
    S: ShippingProvider,
    B: MessagePublisher,
{
    pub fn new(
        cart: C,
        catalog: K,
        payment: P,
        shipping: S,
        publisher: B,
        metrics: Arc<dyn CheckoutMetrics>,
    ) -> Self {
        Self {
            cart,
            catalog,
            payment,
            shipping,
            publisher,
            metrics,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Sets the upper bound for each payment, shipping and publish call.
    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    async fn bounded<T, E, F>(&self, call: F) -> Result<T, StepError>
    where
        F: Future<Output = Result<T, E>> + Send,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StepError::Failed(e.to_string())),
            Err(_) => Err(StepError::TimedOut(self.step_timeout)),
        }
    }

    async fn run(
        &self,
        ctx: &OrderContext,
        cart_id: i64,
        progress: &mut Progress,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let cart = self
            .cart
            .get_cart(&ctx.trace, cart_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "error getting cart from cart service");
                CheckoutError::CartNotFound
            })?;
        progress.advance();

        self.validate_inventory(ctx, &cart).await?;
        progress.advance();

        let shipping_cost = self.estimate_shipping(ctx).await?;
        progress.advance();

        let amount = cart.total + shipping_cost;
        let payment = self
            .bounded(self.payment.charge(amount))
            .await
            .map_err(|e| {
                tracing::error!(amount, error = %e, "error charging card");
                self.metrics.card_declined();
                CheckoutError::CardDeclined
            })?;
        self.metrics.card_charged(amount);
        progress.amount = amount;
        progress.advance();

        let label = self
            .bounded(self.shipping.issue_label(&ctx.postal_code))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "error shipping order");
                self.metrics.label_failed();
                CheckoutError::ShippingLabelNotIssued
            })?;
        self.metrics.label_created(&ctx.postal_code);
        progress.advance();

        let lines_published = self.send_confirmation(ctx, &cart).await?;
        progress.advance();

        Ok(CheckoutReceipt {
            cart_id: cart.id,
            shipping_cost,
            amount_charged: amount,
            payment_id: payment.payment_id,
            tracking_number: label.tracking_number,
            lines_published,
            state: progress.state,
        })
    }

    /// Checks stock for every line, one catalog call per line, and observes
    /// the price delta of each.
    async fn validate_inventory(&self, ctx: &OrderContext, cart: &Cart) -> Result<(), CheckoutError> {
        for item in &cart.items {
            let inventory = self
                .catalog
                .get_product_inventory(&ctx.trace, item.product_id)
                .await
                .map_err(|e| {
                    tracing::error!(
                        product_id = item.product_id,
                        error = %e,
                        "error getting inventory from catalog service"
                    );
                    CheckoutError::ProductNotFound
                })?;

            if !inventory.in_stock() {
                tracing::error!(
                    product_id = item.product_id,
                    quantity = inventory.quantity,
                    "product is out of stock"
                );
                return Err(CheckoutError::InsufficientInventory);
            }

            let delta = item.price_delta(&inventory);
            self.metrics.price_delta(inventory.product.id, delta);
            if delta > PRICE_DELTA_WARN_THRESHOLD {
                tracing::warn!(
                    product_id = inventory.product.id,
                    delta,
                    "pricing delta is too high, the order loses money"
                );
            }
        }
        Ok(())
    }

    async fn estimate_shipping(&self, ctx: &OrderContext) -> Result<f64, CheckoutError> {
        let cost = self
            .bounded(self.shipping.estimate_cost(&ctx.postal_code))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "error getting shipping cost");
                CheckoutError::ShippingCostCalculationFailed
            })?;

        if !cost.is_finite() || cost < 0.0 {
            tracing::error!(cost, "shipping provider quoted an invalid cost");
            return Err(CheckoutError::ShippingCostCalculationFailed);
        }
        Ok(cost)
    }

    /// Publishes one inventory update per cart line. Lines published before a
    /// failure stay published.
    async fn send_confirmation(&self, ctx: &OrderContext, cart: &Cart) -> Result<usize, CheckoutError> {
        let mut published = 0;
        for item in &cart.items {
            let message = item.to_inventory_update();
            let payload = serde_json::to_vec(&message).map_err(|e| {
                tracing::error!(product_id = item.product_id, error = %e, "error encoding inventory update");
                CheckoutError::InventoryUpdateFailure
            })?;

            self.bounded(
                self.publisher
                    .publish(&ctx.trace, &payload, INVENTORY_UPDATE_ROUTING_KEY),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    product_id = item.product_id,
                    published,
                    remaining = cart.items.len() - published,
                    error = %e,
                    "error sending confirmation"
                );
                CheckoutError::InventoryUpdateFailure
            })?;
            published += 1;
        }
        Ok(published)
    }

    fn record_failure(&self, cart_id: i64, kind: CheckoutError, progress: &mut Progress) {
        if let Some(reason) = kind.reason() {
            self.metrics.order_failed(reason);
            if progress.state.is_charged() {
                let amount = progress.amount;
                tracing::error!(
                    cart_id,
                    amount,
                    reason = %reason,
                    "card was charged but the order failed, needs manual reconciliation"
                );
                self.metrics.charge_unreconciled(reason, amount);
            }
        }
        tracing::debug!(from = %progress.state, error = %kind, "checkout failed");
        progress.state = CheckoutState::Failed(kind);
    }
}

#[async_trait]
impl<C, K, P, S, B> OrderPlacer for CheckoutOrchestrator<C, K, P, S, B>
where
    C: CartRepository,
    K: CatalogRepository,
    P: PaymentGateway,
    S: ShippingProvider,
    B: MessagePublisher,
{
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %clients::propagation::trace_id(&ctx.trace)))]
    async fn place_order(
        &self,
        ctx: &OrderContext,
        cart_id: i64,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let mut progress = Progress::default();

        match self.run(ctx, cart_id, &mut progress).await {
            Ok(receipt) => {
                self.metrics.order_succeeded();
                tracing::info!(
                    amount = receipt.amount_charged,
                    lines = receipt.lines_published,
                    "order placed"
                );
                Ok(receipt)
            }
            Err(kind) => {
                self.record_failure(cart_id, kind, &mut progress);
                Err(kind)
            }
        }
    }
}
