//! Message broker publishing.
//!
//! [`BrokerPublisher`] owns the connection state and trace propagation; the
//! wire protocol sits behind [`BrokerTransport`] / [`BrokerChannel`] so the
//! AMQP implementation and the in-memory test transport share one contract.

pub mod amqp;
pub mod memory;
pub mod publisher;

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;

use crate::error::Result;
use crate::propagation::MessageHeaders;

pub use amqp::{AmqpChannel, AmqpConfig, AmqpTransport};
pub use memory::{InMemoryBroker, InMemoryChannel};
pub use publisher::BrokerPublisher;

/// Content type of every published message.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Publishes payloads to the broker under a routing key.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes `payload`, carrying the trace context in the message headers.
    async fn publish(&self, cx: &Context, payload: &[u8], routing_key: &str) -> Result<()>;
}

#[async_trait]
impl<P: MessagePublisher + ?Sized> MessagePublisher for Arc<P> {
    async fn publish(&self, cx: &Context, payload: &[u8], routing_key: &str) -> Result<()> {
        (**self).publish(cx, payload, routing_key).await
    }
}

/// A fully built message, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub exchange: String,
    pub routing_key: String,
    pub content_type: String,
    pub headers: MessageHeaders,
    pub payload: Vec<u8>,
}

/// Opens channels to a broker.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    type Channel: BrokerChannel;

    /// Establishes a new connection and channel.
    async fn connect(&self) -> Result<Self::Channel>;
}

/// An open channel on a broker connection.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Returns false once the channel or its connection has closed.
    fn is_open(&self) -> bool;

    /// Sends one message.
    async fn publish(&self, message: OutgoingMessage) -> Result<()>;

    /// Closes the channel and its connection.
    async fn close(&self) -> Result<()>;
}
