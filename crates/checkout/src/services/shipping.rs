//! Shipping provider trait and implementations.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use crate::error::ServiceError;

/// Result of a successful label issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingLabel {
    /// The tracking number assigned by the provider.
    pub tracking_number: String,
    pub postal_code: String,
}

/// Prices and ships orders.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
    /// Returns a non-negative shipping cost for the destination.
    async fn estimate_cost(&self, postal_code: &str) -> Result<f64, ServiceError>;

    /// Issues a shipping label for the destination.
    async fn issue_label(&self, postal_code: &str) -> Result<ShippingLabel, ServiceError>;
}

/// Provider that waits a fixed latency per call and succeeds at random.
#[derive(Debug, Clone)]
pub struct SimulatedShippingProvider {
    cost_latency: Duration,
    label_latency: Duration,
    success_probability: f64,
    max_cost: f64,
}

impl SimulatedShippingProvider {
    pub const DEFAULT_COST_LATENCY: Duration = Duration::from_millis(100);
    pub const DEFAULT_LABEL_LATENCY: Duration = Duration::from_millis(30);
    pub const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.8;
    pub const DEFAULT_MAX_COST: f64 = 10.0;

    pub fn new(cost_latency: Duration, label_latency: Duration, success_probability: f64) -> Self {
        Self {
            cost_latency,
            label_latency,
            success_probability: super::probability(
                success_probability,
                Self::DEFAULT_SUCCESS_PROBABILITY,
            ),
            max_cost: Self::DEFAULT_MAX_COST,
        }
    }

    fn roll(&self) -> bool {
        rand::thread_rng().gen_bool(self.success_probability)
    }
}

impl Default for SimulatedShippingProvider {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_COST_LATENCY,
            Self::DEFAULT_LABEL_LATENCY,
            Self::DEFAULT_SUCCESS_PROBABILITY,
        )
    }
}

#[async_trait]
impl ShippingProvider for SimulatedShippingProvider {
    #[tracing::instrument(skip(self))]
    async fn estimate_cost(&self, postal_code: &str) -> Result<f64, ServiceError> {
        tokio::time::sleep(self.cost_latency).await;

        if !self.roll() {
            tracing::error!("failed to calculate shipping cost");
            return Err(ServiceError::Rejected(
                "shipping cost unavailable".to_string(),
            ));
        }

        let cost = rand::thread_rng().gen_range(0.0..self.max_cost);
        tracing::info!(cost, "calculated shipping cost");
        Ok(cost)
    }

    #[tracing::instrument(skip(self))]
    async fn issue_label(&self, postal_code: &str) -> Result<ShippingLabel, ServiceError> {
        tokio::time::sleep(self.label_latency).await;

        if !self.roll() {
            tracing::error!("failed to create shipping label");
            return Err(ServiceError::Rejected("label not issued".to_string()));
        }

        tracing::info!("created shipping label");
        Ok(ShippingLabel {
            tracking_number: Uuid::new_v4().to_string(),
            postal_code: postal_code.to_string(),
        })
    }
}

#[derive(Debug)]
struct InMemoryShippingState {
    cost: f64,
    delay: Duration,
    next_id: u32,
    cost_calls: usize,
    label_calls: usize,
    fail_on_estimate: bool,
    fail_on_label: bool,
}

impl Default for InMemoryShippingState {
    fn default() -> Self {
        Self {
            cost: 5.0,
            delay: Duration::ZERO,
            next_id: 0,
            cost_calls: 0,
            label_calls: 0,
            fail_on_estimate: false,
            fail_on_label: false,
        }
    }
}

/// In-memory shipping provider for testing. Quotes a fixed cost (5.0 unless
/// changed).
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingProvider {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quoted cost. A negative cost is returned as-is.
    pub fn set_cost(&self, cost: f64) {
        self.state.write().unwrap().cost = cost;
    }

    /// Delays every call by `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state.write().unwrap().delay = delay;
    }

    async fn wait(&self) {
        let delay = self.state.read().unwrap().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn set_fail_on_estimate(&self, fail: bool) {
        self.state.write().unwrap().fail_on_estimate = fail;
    }

    pub fn set_fail_on_label(&self, fail: bool) {
        self.state.write().unwrap().fail_on_label = fail;
    }

    pub fn estimate_calls(&self) -> usize {
        self.state.read().unwrap().cost_calls
    }

    pub fn label_calls(&self) -> usize {
        self.state.read().unwrap().label_calls
    }
}

#[async_trait]
impl ShippingProvider for InMemoryShippingProvider {
    async fn estimate_cost(&self, _postal_code: &str) -> Result<f64, ServiceError> {
        self.wait().await;
        let mut state = self.state.write().unwrap();
        state.cost_calls += 1;

        if state.fail_on_estimate {
            return Err(ServiceError::Rejected("shipping unavailable".to_string()));
        }
        Ok(state.cost)
    }

    async fn issue_label(&self, postal_code: &str) -> Result<ShippingLabel, ServiceError> {
        self.wait().await;
        let mut state = self.state.write().unwrap();
        state.label_calls += 1;

        if state.fail_on_label {
            return Err(ServiceError::Rejected("shipping unavailable".to_string()));
        }

        state.next_id += 1;
        Ok(ShippingLabel {
            tracking_number: format!("TRACK-{:04}", state.next_id),
            postal_code: postal_code.to_string(),
        })
    }
}
