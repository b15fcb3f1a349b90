//! External effects of the checkout saga.
//!
//! Payment and shipping are capability traits so the simulated providers
//! used in production and the deterministic doubles used in tests share one
//! contract.

pub mod payment;
pub mod shipping;

pub use payment::{InMemoryPaymentGateway, PaymentGateway, PaymentReceipt, SimulatedPaymentGateway};
pub use shipping::{
    InMemoryShippingProvider, ShippingLabel, ShippingProvider, SimulatedShippingProvider,
};

/// Clamps a success probability into `[0, 1]`. NaN yields `fallback`.
pub(crate) fn probability(p: f64, fallback: f64) -> f64 {
    if p.is_nan() { fallback } else { p.clamp(0.0, 1.0) }
}
