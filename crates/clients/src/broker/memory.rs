//! In-memory broker transport for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::broker::{BrokerChannel, BrokerTransport, OutgoingMessage};
use crate::error::{ClientError, Result};

#[derive(Debug, Default)]
struct InMemoryBrokerState {
    published: Vec<OutgoingMessage>,
    publish_attempts: usize,
    connects: usize,
    /// Incremented on every connect; channels from older generations are closed.
    generation: usize,
    channel_open: bool,
    fail_on_publish: Option<usize>,
    fail_on_connect: bool,
}

/// In-memory broker that records published messages.
///
/// Clones share state, so a test can keep a handle while the publisher owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<InMemoryBrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, in publish order.
    pub fn published(&self) -> Vec<OutgoingMessage> {
        self.state.lock().unwrap().published.clone()
    }

    /// Publish calls received, including rejected ones.
    pub fn publish_attempts(&self) -> usize {
        self.state.lock().unwrap().publish_attempts
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Rejects the `n`th publish attempt (1-based). `None` accepts everything.
    pub fn set_fail_on_publish(&self, n: Option<usize>) {
        self.state.lock().unwrap().fail_on_publish = n;
    }

    /// Configures connect attempts to fail.
    pub fn set_fail_on_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_connect = fail;
    }

    /// Simulates the broker closing the current channel.
    pub fn close_channel(&self) {
        self.state.lock().unwrap().channel_open = false;
    }
}

#[async_trait]
impl BrokerTransport for InMemoryBroker {
    type Channel = InMemoryChannel;

    async fn connect(&self) -> Result<InMemoryChannel> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_connect {
            return Err(ClientError::Connection("broker unreachable".to_string()));
        }

        state.connects += 1;
        state.generation += 1;
        state.channel_open = true;

        Ok(InMemoryChannel {
            broker: self.clone(),
            generation: state.generation,
        })
    }
}

/// Channel handed out by [`InMemoryBroker`].
#[derive(Debug)]
pub struct InMemoryChannel {
    broker: InMemoryBroker,
    generation: usize,
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    fn is_open(&self) -> bool {
        let state = self.broker.state.lock().unwrap();
        state.channel_open && state.generation == self.generation
    }

    async fn publish(&self, message: OutgoingMessage) -> Result<()> {
        let mut state = self.broker.state.lock().unwrap();
        state.publish_attempts += 1;

        if !(state.channel_open && state.generation == self.generation) {
            return Err(ClientError::ChannelClosed);
        }
        if state.fail_on_publish == Some(state.publish_attempts) {
            return Err(ClientError::Publish("broker rejected message".to_string()));
        }

        state.published.push(message);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.broker.state.lock().unwrap();
        if state.generation == self.generation {
            state.channel_open = false;
        }
        Ok(())
    }
}
