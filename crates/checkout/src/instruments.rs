//! Business instruments for the checkout saga.

use std::sync::{Arc, Mutex};

use metrics::{Counter, Histogram};

use crate::error::FailureReason;

/// Business-level observations made while placing an order.
pub trait CheckoutMetrics: Send + Sync {
    /// Counts an order that reached `Confirmed`.
    fn order_succeeded(&self);

    /// Counts an order that failed, tagged with the step that failed.
    fn order_failed(&self, reason: FailureReason);

    /// Observes `catalog price - cart price` for one line.
    fn price_delta(&self, product_id: i64, delta: f64);

    /// Counts a successful charge and observes the charged amount.
    fn card_charged(&self, amount: f64);

    fn card_declined(&self);

    fn label_created(&self, postal_code: &str);

    fn label_failed(&self);

    /// Counts an order that failed after the card was charged.
    fn charge_unreconciled(&self, reason: FailureReason, amount: f64);
}

/// [`CheckoutMetrics`] backed by the `metrics` facade.
///
/// Unlabelled instruments are registered once at construction; labelled ones
/// are looked up per observation.
#[derive(Clone)]
pub struct RecorderCheckoutMetrics {
    orders_successful: Counter,
    cards_charged: Counter,
    income: Histogram,
    cards_declined: Counter,
    labels_failed: Counter,
    unreconciled_amount: Histogram,
}

impl RecorderCheckoutMetrics {
    pub fn new() -> Self {
        metrics::describe_counter!(
            "checkout_orders_successful_total",
            "Orders placed successfully"
        );
        metrics::describe_counter!("checkout_orders_failed_total", "Orders failed, by reason");
        metrics::describe_histogram!(
            "checkout_price_delta",
            "Catalog price minus cart price, by product"
        );
        metrics::describe_histogram!("checkout_income", "Amount charged per order");
        metrics::describe_counter!(
            "checkout_orders_unreconciled_total",
            "Orders that failed after the card was charged"
        );

        Self {
            orders_successful: metrics::counter!("checkout_orders_successful_total"),
            cards_charged: metrics::counter!("checkout_cards_charged_total"),
            income: metrics::histogram!("checkout_income"),
            cards_declined: metrics::counter!("checkout_cards_declined_total"),
            labels_failed: metrics::counter!("checkout_labels_failed_total"),
            unreconciled_amount: metrics::histogram!("checkout_unreconciled_amount"),
        }
    }
}

impl Default for RecorderCheckoutMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutMetrics for RecorderCheckoutMetrics {
    fn order_succeeded(&self) {
        self.orders_successful.increment(1);
    }

    fn order_failed(&self, reason: FailureReason) {
        metrics::counter!("checkout_orders_failed_total", "reason" => reason.as_str())
            .increment(1);
    }

    fn price_delta(&self, product_id: i64, delta: f64) {
        metrics::histogram!("checkout_price_delta", "product_id" => product_id.to_string())
            .record(delta);
    }

    fn card_charged(&self, amount: f64) {
        self.cards_charged.increment(1);
        self.income.record(amount);
    }

    fn card_declined(&self) {
        self.cards_declined.increment(1);
    }

    fn label_created(&self, postal_code: &str) {
        metrics::counter!("checkout_labels_created_total", "postal_code" => postal_code.to_string())
            .increment(1);
    }

    fn label_failed(&self) {
        self.labels_failed.increment(1);
    }

    fn charge_unreconciled(&self, reason: FailureReason, amount: f64) {
        metrics::counter!("checkout_orders_unreconciled_total", "reason" => reason.as_str())
            .increment(1);
        self.unreconciled_amount.record(amount);
    }
}

#[derive(Debug, Default)]
struct CheckoutCounts {
    succeeded: u64,
    failed: Vec<FailureReason>,
    price_deltas: Vec<(i64, f64)>,
    charged: Vec<f64>,
    declined: u64,
    labels: Vec<String>,
    labels_failed: u64,
    unreconciled: Vec<(FailureReason, f64)>,
}

/// In-memory [`CheckoutMetrics`] for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckoutMetrics {
    state: Arc<Mutex<CheckoutCounts>>,
}

impl InMemoryCheckoutMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded_count(&self) -> u64 {
        self.state.lock().unwrap().succeeded
    }

    /// Failure tags in the order they were recorded.
    pub fn failures(&self) -> Vec<FailureReason> {
        self.state.lock().unwrap().failed.clone()
    }

    /// `(product_id, delta)` observations in the order they were recorded.
    pub fn price_deltas(&self) -> Vec<(i64, f64)> {
        self.state.lock().unwrap().price_deltas.clone()
    }

    /// Charged amounts.
    pub fn charges(&self) -> Vec<f64> {
        self.state.lock().unwrap().charged.clone()
    }

    pub fn declined_count(&self) -> u64 {
        self.state.lock().unwrap().declined
    }

    /// Postal codes of created labels.
    pub fn labels(&self) -> Vec<String> {
        self.state.lock().unwrap().labels.clone()
    }

    pub fn labels_failed_count(&self) -> u64 {
        self.state.lock().unwrap().labels_failed
    }

    pub fn unreconciled(&self) -> Vec<(FailureReason, f64)> {
        self.state.lock().unwrap().unreconciled.clone()
    }
}

impl CheckoutMetrics for InMemoryCheckoutMetrics {
    fn order_succeeded(&self) {
        self.state.lock().unwrap().succeeded += 1;
    }

    fn order_failed(&self, reason: FailureReason) {
        self.state.lock().unwrap().failed.push(reason);
    }

    fn price_delta(&self, product_id: i64, delta: f64) {
        self.state
            .lock()
            .unwrap()
            .price_deltas
            .push((product_id, delta));
    }

    fn card_charged(&self, amount: f64) {
        self.state.lock().unwrap().charged.push(amount);
    }

    fn card_declined(&self) {
        self.state.lock().unwrap().declined += 1;
    }

    fn label_created(&self, postal_code: &str) {
        self.state
            .lock()
            .unwrap()
            .labels
            .push(postal_code.to_string());
    }

    fn label_failed(&self) {
        self.state.lock().unwrap().labels_failed += 1;
    }

    fn charge_unreconciled(&self, reason: FailureReason, amount: f64) {
        self.state
            .lock()
            .unwrap()
            .unreconciled
            .push((reason, amount));
    }
}
