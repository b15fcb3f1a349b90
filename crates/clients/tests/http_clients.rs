//! Integration tests for the cart and catalog clients against a local server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::Instrument;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use clients::{
    CartClient, CartRepository, CatalogClient, CatalogRepository, ClientError, HttpClientConfig,
    InMemoryRequestMetrics,
};
use clients::propagation::{self, HeaderExtractor, TRACEPARENT_HEADER};
use opentelemetry::Context;
use opentelemetry::trace::{
    SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState, TracerProvider as _,
};
use opentelemetry_sdk::trace::TracerProvider;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone, Default)]
struct Seen {
    traceparents: Arc<Mutex<Vec<String>>>,
}

impl Seen {
    fn record(&self, headers: &HeaderMap) {
        if let Some(v) = headers.get(TRACEPARENT_HEADER).and_then(|v| v.to_str().ok()) {
            self.traceparents.lock().unwrap().push(v.to_string());
        }
    }

    fn all(&self) -> Vec<String> {
        self.traceparents.lock().unwrap().clone()
    }
}

async fn cart(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> axum::response::Response {
    seen.record(&headers);
    match id {
        42 => Json(serde_json::json!({
            "id": 42,
            "items": [{ "product_id": 7, "quantity": 2, "price": 9.99 }],
            "total": 19.98
        }))
        .into_response(),
        13 => (StatusCode::OK, "not json").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn product(Path(id): Path<i64>) -> axum::response::Response {
    if id != 7 {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(serde_json::json!({
        "id": 7, "name": "Widget", "description": "A widget", "price": 9.99, "image": null
    }))
    .into_response()
}

async fn inventory(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> axum::response::Response {
    seen.record(&headers);
    match id {
        7 => Json(serde_json::json!({
            "id": 1,
            "product": { "id": 7, "name": "Widget", "description": "", "price": 9.99 },
            "quantity": 5
        }))
        .into_response(),
        500 => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "{}"
}

async fn serve(seen: Seen) -> SocketAddr {
    let app = Router::new()
        .route("/cart/{id}", get(cart))
        .route("/products/{id}", get(product))
        .route("/products/{id}/inventory", get(inventory))
        .route("/slow/cart/{id}", get(slow))
        .with_state(seen);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn remote_cx() -> Context {
    Context::new().with_remote_span_context(SpanContext::new(
        TraceId::from_bytes([0x4b; 16]),
        SpanId::from_bytes([0x0f; 8]),
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    ))
}

fn carried(traceparent: &str) -> Context {
    let mut headers = HeaderMap::new();
    headers.insert(TRACEPARENT_HEADER, traceparent.parse().unwrap());
    propagation::extract(&HeaderExtractor(&headers)).unwrap()
}

fn span_id(cx: &Context) -> SpanId {
    cx.span().span_context().span_id()
}

fn config(addr: SocketAddr) -> HttpClientConfig {
    HttpClientConfig::new(format!("http://{addr}"), Duration::from_secs(1))
}

#[tokio::test]
async fn test_get_cart_decodes_snapshot() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let metrics = InMemoryRequestMetrics::new();
    let client = CartClient::new(&config(addr), Arc::new(metrics.clone())).unwrap();
    let cx = remote_cx();

    let cart = client.get_cart(&cx, 42).await.unwrap();

    assert_eq!(cart.id, 42);
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, 7);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.total, 19.98);
    assert_eq!(metrics.success_count(), 1);
    assert_eq!(metrics.failure_count(), 0);
    assert_eq!(metrics.duration_count(), 1);

    let carried = carried(&seen.all()[0]);
    assert_eq!(propagation::trace_id(&carried), propagation::trace_id(&cx));
}

#[tokio::test]
async fn test_untraced_call_sends_no_traceparent() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let client = CartClient::new(&config(addr), Arc::new(InMemoryRequestMetrics::new())).unwrap();

    client.get_cart(&Context::new(), 42).await.unwrap();

    assert!(seen.all().is_empty());
}

#[tokio::test]
async fn test_recorded_span_is_propagated_as_parent() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let client = CartClient::new(&config(addr), Arc::new(InMemoryRequestMetrics::new())).unwrap();

    let tracer = TracerProvider::builder().build().tracer("http_clients");
    let subscriber =
        tracing_subscriber::registry().with(tracing_opentelemetry::layer().with_tracer(tracer));
    let _guard = tracing::subscriber::set_default(subscriber);

    let parent = remote_cx();
    let span = tracing::info_span!("checkout");
    span.set_parent(parent.clone());
    let cx = span.context();

    async { client.get_cart(&cx, 42).await }
        .instrument(span)
        .await
        .unwrap();

    let carried = carried(&seen.all()[0]);
    assert_eq!(propagation::trace_id(&carried), propagation::trace_id(&parent));
    assert_ne!(span_id(&carried), span_id(&parent));
    assert_ne!(span_id(&carried), span_id(&cx));
}

#[tokio::test]
async fn test_get_cart_not_found_is_error() {
    let addr = serve(Seen::default()).await;
    let metrics = InMemoryRequestMetrics::new();
    let client = CartClient::new(&config(addr), Arc::new(metrics.clone())).unwrap();

    let result = client.get_cart(&Context::new(), 1).await;

    assert!(matches!(result, Err(ClientError::Status { status: 404, .. })));
    assert_eq!(metrics.failure_count(), 1);
    assert_eq!(metrics.success_count(), 0);
}

#[tokio::test]
async fn test_get_cart_bad_body_is_error() {
    let addr = serve(Seen::default()).await;
    let metrics = InMemoryRequestMetrics::new();
    let client = CartClient::new(&config(addr), Arc::new(metrics.clone())).unwrap();

    let result = client.get_cart(&Context::new(), 13).await;

    assert!(matches!(result, Err(ClientError::Decode(_))));
    assert_eq!(metrics.failure_count(), 1);
}

#[tokio::test]
async fn test_timeout_is_plain_failure() {
    let addr = serve(Seen::default()).await;
    let metrics = InMemoryRequestMetrics::new();
    let client = CartClient::new(
        &HttpClientConfig::new(format!("http://{addr}/slow"), Duration::from_millis(200)),
        Arc::new(metrics.clone()),
    )
    .unwrap();

    let result = client.get_cart(&Context::new(), 42).await;

    assert!(matches!(result, Err(ClientError::Http(_))));
    assert_eq!(metrics.failure_count(), 1);
}

#[tokio::test]
async fn test_get_product_inventory() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let metrics = InMemoryRequestMetrics::new();
    let client = CatalogClient::new(&config(addr), Arc::new(metrics.clone())).unwrap();

    let inventory = client
        .get_product_inventory(&Context::new(), 7)
        .await
        .unwrap();

    assert_eq!(inventory.quantity, 5);
    assert_eq!(inventory.product.id, 7);
    assert_eq!(inventory.product.price, 9.99);
    assert_eq!(metrics.success_count(), 1);
    assert_eq!(seen.all().len(), 1);
}

#[tokio::test]
async fn test_get_product_inventory_server_error() {
    let addr = serve(Seen::default()).await;
    let metrics = InMemoryRequestMetrics::new();
    let client = CatalogClient::new(&config(addr), Arc::new(metrics.clone())).unwrap();

    let result = client
        .get_product_inventory(&Context::new(), 500)
        .await;

    assert!(matches!(result, Err(ClientError::Status { status: 500, .. })));
    assert_eq!(metrics.failure_count(), 1);
}

#[tokio::test]
async fn test_get_product() {
    let addr = serve(Seen::default()).await;
    let client = CatalogClient::new(&config(addr), Arc::new(InMemoryRequestMetrics::new())).unwrap();

    let product = client.get_product(&Context::new(), 7).await.unwrap();
    assert_eq!(product.name, "Widget");
    assert!(product.image.is_none());

    let missing = client.get_product(&Context::new(), 8).await;
    assert!(missing.is_err());
}
