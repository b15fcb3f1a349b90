//! Checkout server entry point.

use std::sync::Arc;

use api::config::Config;
use checkout::{
    CheckoutOrchestrator, CheckoutService, RecorderCheckoutMetrics, SimulatedPaymentGateway,
    SimulatedShippingProvider,
};
use clients::{
    AmqpTransport, BrokerPublisher, CartClient, CatalogClient, RecorderPublishMetrics,
    RecorderRequestMetrics,
};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use tokio::signal;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Installs the log subscriber. Spans also become OpenTelemetry spans, so
/// outbound `traceparent` headers name the span that made the call.
fn init_tracing(config: &Config) -> TracerProvider {
    let provider = TracerProvider::builder().build();
    let otel = tracing_opentelemetry::layer().with_tracer(provider.tracer("checkout"));

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter).with(otel);

    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    provider
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env().expect("invalid configuration");
    let tracer_provider = init_tracing(&config);

    // 2. Install Prometheus metrics recorder before any instrument registers
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build collaborators
    let cart = CartClient::new(
        &config.cart.http_config(),
        Arc::new(RecorderRequestMetrics::new("cart")),
    )
    .expect("failed to build cart client");
    let catalog = CatalogClient::new(
        &config.catalog.http_config(),
        Arc::new(RecorderRequestMetrics::new("catalog")),
    )
    .expect("failed to build catalog client");

    let publisher = Arc::new(
        BrokerPublisher::connect(
            AmqpTransport::new(&config.rabbitmq),
            config.rabbitmq.exchange.clone(),
            Arc::new(RecorderPublishMetrics::new()),
        )
        .await
        .expect("failed to connect to the broker"),
    );
    tracing::info!(
        host = %config.rabbitmq.host,
        exchange = %config.rabbitmq.exchange,
        "connected to the broker"
    );

    // 4. Wire the checkout saga
    let orchestrator = CheckoutOrchestrator::new(
        cart,
        catalog,
        SimulatedPaymentGateway::default(),
        SimulatedShippingProvider::default(),
        publisher.clone(),
        Arc::new(RecorderCheckoutMetrics::new()),
    )
    .with_step_timeout(config.step_timeout);
    let state = Arc::new(api::AppState::new(CheckoutService::new(Arc::new(
        orchestrator,
    ))));

    // 5. Build the application
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting checkout server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(());
            })
            .await
    });

    // 7. Drain in-flight requests for at most the grace period
    let _ = signalled_rx.await;
    match tokio::time::timeout(config.shutdown_grace, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("server shut down gracefully"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "server task failed"),
        Err(_) => tracing::warn!(
            grace = ?config.shutdown_grace,
            "in-flight requests did not finish in time, forcing shutdown"
        ),
    }

    if let Err(e) = publisher.close().await {
        tracing::warn!(error = %e, "failed to close broker channel");
    }
    if let Err(e) = tracer_provider.shutdown() {
        tracing::warn!(error = %e, "failed to shut down tracer provider");
    }
}
