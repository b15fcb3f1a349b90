//! Integration tests for the API server.

use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::{
    CheckoutError, CheckoutReceipt, CheckoutService, CheckoutState, OrderContext, OrderPlacer,
};
use clients::propagation;
use opentelemetry::trace::{SpanId, TraceContextExt, TraceId};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Records each call and answers with a fixed outcome.
#[derive(Default)]
struct StubPlacer {
    calls: Mutex<Vec<(OrderContext, i64)>>,
    fail_with: Option<CheckoutError>,
}

impl StubPlacer {
    fn failing(kind: CheckoutError) -> Self {
        Self {
            fail_with: Some(kind),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(OrderContext, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderPlacer for StubPlacer {
    async fn place_order(
        &self,
        ctx: &OrderContext,
        cart_id: i64,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        self.calls.lock().unwrap().push((ctx.clone(), cart_id));
        match self.fail_with {
            Some(kind) => Err(kind),
            None => Ok(CheckoutReceipt {
                cart_id,
                shipping_cost: 1.0,
                amount_charged: 2.0,
                payment_id: "PAY-0001".to_string(),
                tracking_number: "TRACK-0001".to_string(),
                lines_published: 1,
                state: CheckoutState::Confirmed,
            }),
        }
    }
}

fn setup(placer: Arc<StubPlacer>) -> axum::Router {
    let state = Arc::new(api::AppState::new(CheckoutService::new(placer)));
    api::create_app(state, get_metrics_handle())
}

fn order_body() -> String {
    serde_json::json!({
        "user_id": "u-1",
        "email": "buyer@example.com",
        "address": {
            "street_address": "1 Main St",
            "city": "Berlin",
            "state": "BE",
            "postal_code": "10115",
            "country": "DE"
        },
        "credit_card": {
            "card_number": "4111111111111111",
            "card_cvv": 123,
            "card_expiration_month": 12,
            "card_expiration_year": 2030
        }
    })
    .to_string()
}

fn checkout_request(cart_id: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/checkout/{cart_id}"))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup(Arc::new(StubPlacer::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "checkout");
}

#[tokio::test]
async fn test_checkout_created() {
    let placer = Arc::new(StubPlacer::default());
    let app = setup(placer.clone());

    let response = app
        .oneshot(checkout_request("42", order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(body_text(response).await.is_empty());

    let calls = placer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, 42);
    assert_eq!(calls[0].0.postal_code, "10115");
}

#[tokio::test]
async fn test_checkout_continues_inbound_trace() {
    let placer = Arc::new(StubPlacer::default());
    let app = setup(placer.clone());

    let mut request = checkout_request("42", order_body());
    request.headers_mut().insert(
        "traceparent",
        "00-4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b4b-0f0f0f0f0f0f0f0f-01"
            .parse()
            .unwrap(),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let trace = placer.calls()[0].0.trace.clone();
    assert_eq!(propagation::trace_id(&trace), TraceId::from_bytes([0x4b; 16]));
    assert_eq!(
        trace.span().span_context().span_id(),
        SpanId::from_bytes([0x0f; 8])
    );
}

#[tokio::test]
async fn test_checkout_ignores_malformed_traceparent() {
    let placer = Arc::new(StubPlacer::default());
    let app = setup(placer.clone());

    let mut request = checkout_request("42", order_body());
    request
        .headers_mut()
        .insert("traceparent", "00-zz-0f-01".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        propagation::trace_id(&placer.calls()[0].0.trace),
        TraceId::INVALID
    );
}

#[tokio::test]
async fn test_checkout_malformed_body_is_bad_request() {
    let placer = Arc::new(StubPlacer::default());
    let app = setup(placer.clone());

    let response = app
        .oneshot(checkout_request("42", "{not json".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!body_text(response).await.is_empty());
    assert!(placer.calls().is_empty());
}

#[tokio::test]
async fn test_checkout_non_integer_cart_id_is_bad_request() {
    let placer = Arc::new(StubPlacer::default());
    let app = setup(placer.clone());

    let response = app
        .oneshot(checkout_request("abc", order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(placer.calls().is_empty());
}

#[tokio::test]
async fn test_checkout_failure_is_server_error_with_message() {
    let app = setup(Arc::new(StubPlacer::failing(
        CheckoutError::InsufficientInventory,
    )));

    let response = app
        .oneshot(checkout_request("42", order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "insufficient inventory");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup(Arc::new(StubPlacer::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = setup(Arc::new(StubPlacer::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_requires_post() {
    let app = setup(Arc::new(StubPlacer::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/checkout/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
