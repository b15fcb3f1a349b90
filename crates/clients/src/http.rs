//! Pooled HTTP transport shared by the cart and catalog clients.

use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::Context;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};
use crate::instruments::RequestMetrics;
use crate::propagation::{self, HeaderInjector};

const MAX_IDLE_PER_HOST: usize = 1000;
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a collaborator lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

/// JSON-over-HTTP access to one collaborator service.
///
/// Holds one connection pool for the lifetime of the process. Each call
/// carries the trace context of the current span and reports its duration
/// and outcome to the injected [`RequestMetrics`]. The configured timeout is
/// the only bound on a call.
#[derive(Clone)]
pub struct HttpCollaborator {
    name: &'static str,
    client: reqwest::Client,
    base_url: String,
    metrics: Arc<dyn RequestMetrics>,
}

impl HttpCollaborator {
    /// Builds the pooled client for `config`.
    pub fn new(
        name: &'static str,
        config: &HttpClientConfig,
        metrics: Arc<dyn RequestMetrics>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .build()?;

        Ok(Self {
            name,
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            metrics,
        })
    }

    /// Returns the collaborator name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base_url}/{path}` and decode the JSON body.
    ///
    /// Statuses of 400 and above, transport errors and undecodable bodies are
    /// all reported as errors.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, cx: &Context) -> Result<T> {
        let url = self.url(path);
        let mut headers = HeaderMap::new();
        let outbound = propagation::outbound_context(&tracing::Span::current(), cx);
        propagation::inject(&outbound, &mut HeaderInjector(&mut headers));

        let start = Instant::now();
        let result = self.fetch(&url, headers).await;
        self.metrics.record_duration(start.elapsed());

        match &result {
            Ok(_) => self.metrics.record_success(),
            Err(e) => {
                tracing::error!(collaborator = self.name, %url, error = %e, "request failed");
                self.metrics.record_failure();
            }
        }
        result
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap) -> Result<T> {
        let response = self.client.get(url).headers(headers).send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
