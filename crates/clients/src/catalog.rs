//! Catalog service client.

use std::sync::Arc;

use async_trait::async_trait;
use common::{Inventory, Product};
use opentelemetry::Context;

use crate::error::Result;
use crate::http::{HttpClientConfig, HttpCollaborator};
use crate::instruments::RequestMetrics;

/// Read access to products and their stock levels.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fetches a product record.
    async fn get_product(&self, cx: &Context, product_id: i64) -> Result<Product>;

    /// Fetches the stock level and current product record.
    async fn get_product_inventory(
        &self,
        cx: &Context,
        product_id: i64,
    ) -> Result<Inventory>;
}

/// HTTP client for the catalog service.
///
/// - `GET /products/{id}`
/// - `GET /products/{id}/inventory`
#[derive(Clone)]
pub struct CatalogClient {
    http: HttpCollaborator,
}

impl CatalogClient {
    pub fn new(config: &HttpClientConfig, metrics: Arc<dyn RequestMetrics>) -> Result<Self> {
        Ok(Self {
            http: HttpCollaborator::new("catalog", config, metrics)?,
        })
    }
}

#[async_trait]
impl CatalogRepository for CatalogClient {
    #[tracing::instrument(skip(self, cx))]
    async fn get_product(&self, cx: &Context, product_id: i64) -> Result<Product> {
        self.http
            .get_json(&format!("products/{product_id}"), cx)
            .await
    }

    #[tracing::instrument(skip(self, cx))]
    async fn get_product_inventory(
        &self,
        cx: &Context,
        product_id: i64,
    ) -> Result<Inventory> {
        self.http
            .get_json(&format!("products/{product_id}/inventory"), cx)
            .await
    }
}
