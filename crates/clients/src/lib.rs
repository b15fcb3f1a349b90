//! Network collaborators of the checkout saga.
//!
//! - [`cart::CartClient`] fetches cart snapshots from the cart service.
//! - [`catalog::CatalogClient`] fetches products and stock from the catalog.
//! - [`broker::BrokerPublisher`] publishes messages to the broker exchange,
//!   reconnecting lazily when the channel has gone away.
//!
//! Every outbound call carries the caller's OpenTelemetry context as W3C
//! `traceparent` headers, see [`propagation`].

pub mod broker;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod http;
pub mod instruments;
pub mod propagation;

pub use broker::{
    AmqpConfig, AmqpTransport, BrokerChannel, BrokerPublisher, BrokerTransport, InMemoryBroker,
    MessagePublisher, OutgoingMessage,
};
pub use cart::{CartClient, CartRepository};
pub use catalog::{CatalogClient, CatalogRepository};
pub use error::{ClientError, Result};
pub use http::{HttpClientConfig, HttpCollaborator};
pub use instruments::{
    InMemoryPublishMetrics, InMemoryRequestMetrics, PublishMetrics, RecorderPublishMetrics,
    RecorderRequestMetrics, RequestMetrics,
};
pub use propagation::{HeaderExtractor, HeaderInjector, MessageHeaders};
