//! Cart service client.

use std::sync::Arc;

use async_trait::async_trait;
use common::Cart;
use opentelemetry::Context;

use crate::error::Result;
use crate::http::{HttpClientConfig, HttpCollaborator};
use crate::instruments::RequestMetrics;

/// Read access to cart snapshots.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Fetches the cart with the given ID.
    async fn get_cart(&self, cx: &Context, cart_id: i64) -> Result<Cart>;
}

/// HTTP client for the cart service (`GET /cart/{id}`).
#[derive(Clone)]
pub struct CartClient {
    http: HttpCollaborator,
}

impl CartClient {
    pub fn new(config: &HttpClientConfig, metrics: Arc<dyn RequestMetrics>) -> Result<Self> {
        Ok(Self {
            http: HttpCollaborator::new("cart", config, metrics)?,
        })
    }
}

#[async_trait]
impl CartRepository for CartClient {
    #[tracing::instrument(skip(self, cx))]
    async fn get_cart(&self, cx: &Context, cart_id: i64) -> Result<Cart> {
        self.http.get_json(&format!("cart/{cart_id}"), cx).await
    }
}
