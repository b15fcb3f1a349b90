//! Payment gateway trait and implementations.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use crate::error::ServiceError;

/// Result of a successful charge.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    /// The payment ID assigned by the gateway.
    pub payment_id: String,
    pub amount: f64,
}

/// Charges the buyer's card.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, amount: f64) -> Result<PaymentReceipt, ServiceError>;
}

/// Gateway that waits a fixed latency and approves a random share of charges.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentGateway {
    latency: Duration,
    success_probability: f64,
}

impl SimulatedPaymentGateway {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(800);
    pub const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.8;

    pub fn new(latency: Duration, success_probability: f64) -> Self {
        Self {
            latency,
            success_probability: super::probability(
                success_probability,
                Self::DEFAULT_SUCCESS_PROBABILITY,
            ),
        }
    }
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LATENCY, Self::DEFAULT_SUCCESS_PROBABILITY)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    #[tracing::instrument(skip(self))]
    async fn charge(&self, amount: f64) -> Result<PaymentReceipt, ServiceError> {
        tokio::time::sleep(self.latency).await;

        let approved = rand::thread_rng().gen_bool(self.success_probability);
        if !approved {
            tracing::error!(amount, "failed to charge card");
            return Err(ServiceError::Rejected("card declined by issuer".to_string()));
        }

        tracing::info!(amount, "successfully charged card");
        Ok(PaymentReceipt {
            payment_id: Uuid::new_v4().to_string(),
            amount,
        })
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: Vec<f64>,
    attempts: usize,
    next_id: u32,
    fail_on_charge: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Amounts successfully charged, in order.
    pub fn charges(&self) -> Vec<f64> {
        self.state.read().unwrap().charges.clone()
    }

    /// Charge calls received, including declined ones.
    pub fn attempts(&self) -> usize {
        self.state.read().unwrap().attempts
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, amount: f64) -> Result<PaymentReceipt, ServiceError> {
        let mut state = self.state.write().unwrap();
        state.attempts += 1;

        if state.fail_on_charge {
            return Err(ServiceError::Rejected("payment declined".to_string()));
        }

        state.next_id += 1;
        state.charges.push(amount);
        Ok(PaymentReceipt {
            payment_id: format!("PAY-{:04}", state.next_id),
            amount,
        })
    }
}
