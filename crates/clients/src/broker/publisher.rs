//! Publisher with lazy reconnection.

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;
use tokio::sync::Mutex;

use crate::broker::{
    BrokerChannel, BrokerTransport, JSON_CONTENT_TYPE, MessagePublisher, OutgoingMessage,
};
use crate::error::{ClientError, Result};
use crate::instruments::PublishMetrics;
use crate::propagation::{self, MessageHeaders};

/// Connection state of the publisher.
///
/// ```text
/// Closed ──connect──► Open ──channel reports closed──► Closed
/// ```
enum ConnectionState<C> {
    Open(C),
    Closed,
}

/// Publishes messages to one exchange over a long-lived channel.
///
/// The channel is held behind a mutex, so concurrent publishes are
/// serialized and never interleave payloads or headers. When the channel is
/// found closed, the next publish reconnects; there is no background
/// reconnect loop.
pub struct BrokerPublisher<T: BrokerTransport> {
    transport: T,
    exchange: String,
    state: Mutex<ConnectionState<T::Channel>>,
    metrics: Arc<dyn PublishMetrics>,
}

impl<T: BrokerTransport> BrokerPublisher<T> {
    /// Creates a publisher that connects on first use.
    pub fn new(
        transport: T,
        exchange: impl Into<String>,
        metrics: Arc<dyn PublishMetrics>,
    ) -> Self {
        Self {
            transport,
            exchange: exchange.into(),
            state: Mutex::new(ConnectionState::Closed),
            metrics,
        }
    }

    /// Creates a publisher and opens the channel immediately.
    pub async fn connect(
        transport: T,
        exchange: impl Into<String>,
        metrics: Arc<dyn PublishMetrics>,
    ) -> Result<Self> {
        let publisher = Self::new(transport, exchange, metrics);
        {
            let mut state = publisher.state.lock().await;
            publisher.ensure_connected(&mut state).await?;
        }
        Ok(publisher)
    }

    /// Returns the exchange messages are published to.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Returns true if an open channel is currently held.
    pub async fn is_connected(&self) -> bool {
        matches!(&*self.state.lock().await, ConnectionState::Open(channel) if channel.is_open())
    }

    /// Closes the held channel, if any. The next publish reconnects.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut *state, ConnectionState::Closed);
        if let ConnectionState::Open(channel) = previous {
            channel.close().await?;
            tracing::info!(exchange = %self.exchange, "broker channel closed");
        }
        Ok(())
    }

    /// Returns the open channel, reconnecting if the held one has gone away.
    async fn ensure_connected<'a>(
        &self,
        state: &'a mut ConnectionState<T::Channel>,
    ) -> Result<&'a T::Channel> {
        let healthy = matches!(&*state, ConnectionState::Open(channel) if channel.is_open());

        if !healthy {
            if let ConnectionState::Open(stale) = std::mem::replace(state, ConnectionState::Closed) {
                tracing::warn!(exchange = %self.exchange, "broker channel was closed, reconnecting");
                if let Err(e) = stale.close().await {
                    tracing::debug!(error = %e, "closing stale channel failed");
                }
            }

            let channel = self.transport.connect().await.inspect_err(|e| {
                tracing::error!(error = %e, "couldn't connect to the broker");
            })?;
            tracing::debug!(exchange = %self.exchange, "opened broker channel");
            *state = ConnectionState::Open(channel);
        }

        match state {
            ConnectionState::Open(channel) => Ok(channel),
            ConnectionState::Closed => Err(ClientError::ChannelClosed),
        }
    }
}

#[async_trait]
impl<T: BrokerTransport> MessagePublisher for BrokerPublisher<T> {
    #[tracing::instrument(skip(self, cx, payload), fields(trace_id = %propagation::trace_id(cx)))]
    async fn publish(&self, cx: &Context, payload: &[u8], routing_key: &str) -> Result<()> {
        let mut headers = MessageHeaders::new();
        let outbound = propagation::outbound_context(&tracing::Span::current(), cx);
        propagation::inject(&outbound, &mut headers);

        let message = OutgoingMessage {
            exchange: self.exchange.clone(),
            routing_key: routing_key.to_string(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            headers,
            payload: payload.to_vec(),
        };

        let mut state = self.state.lock().await;
        let result = match self.ensure_connected(&mut state).await {
            Ok(channel) => channel.publish(message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    payload = %String::from_utf8_lossy(payload),
                    "published message"
                );
                self.metrics.record_published();
                Ok(())
            }
            Err(e) => {
                if matches!(&*state, ConnectionState::Open(channel) if !channel.is_open()) {
                    *state = ConnectionState::Closed;
                }
                tracing::error!(error = %e, "failed to publish message");
                self.metrics.record_failed();
                Err(e)
            }
        }
    }
}
