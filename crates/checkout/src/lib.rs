//! Checkout orchestration.
//!
//! Places an order for a cart by running a strictly sequential saga:
//! 1. Fetch the cart
//! 2. Validate stock for every line and measure the price delta
//! 3. Estimate the shipping cost
//! 4. Charge the card for cart total plus shipping
//! 5. Issue the shipping label
//! 6. Publish one inventory update per cart line
//!
//! Every step either advances or aborts the order with one
//! [`CheckoutError`]. Nothing is retried and nothing is rolled back; a
//! failure after the charge is flagged for reconciliation.

pub mod context;
pub mod error;
pub mod instruments;
pub mod orchestrator;
pub mod service;
pub mod services;
pub mod state;

pub use context::OrderContext;
pub use error::{CheckoutError, FailureReason, ServiceError};
pub use instruments::{CheckoutMetrics, InMemoryCheckoutMetrics, RecorderCheckoutMetrics};
pub use orchestrator::{
    CheckoutOrchestrator, CheckoutReceipt, INVENTORY_UPDATE_ROUTING_KEY, OrderPlacer,
    PRICE_DELTA_WARN_THRESHOLD,
};
pub use service::CheckoutService;
pub use services::{
    InMemoryPaymentGateway, InMemoryShippingProvider, PaymentGateway, PaymentReceipt,
    ShippingLabel, ShippingProvider, SimulatedPaymentGateway, SimulatedShippingProvider,
};
pub use state::CheckoutState;
