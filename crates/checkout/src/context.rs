//! Request-scoped values threaded through the pipeline.

use opentelemetry::Context;

/// Values a single checkout call carries from the request down to each step.
#[derive(Debug, Clone)]
pub struct OrderContext {
    /// Caller's trace context; outbound calls continue it.
    pub trace: Context,
    /// Destination postal code, consumed by the shipping steps.
    pub postal_code: String,
}

impl OrderContext {
    pub fn new(trace: Context, postal_code: impl Into<String>) -> Self {
        Self {
            trace,
            postal_code: postal_code.into(),
        }
    }
}
