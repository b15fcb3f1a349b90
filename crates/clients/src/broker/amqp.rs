//! AMQP 0-9-1 transport backed by `lapin`.

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

use crate::broker::{BrokerChannel, BrokerTransport, OutgoingMessage};
use crate::error::Result;
use crate::propagation::MessageHeaders;

const REPLY_SUCCESS: u16 = 200;

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmqpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub exchange: String,
}

impl AmqpConfig {
    /// Connection URI for the default vhost.
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Connects to a RabbitMQ-compatible broker.
#[derive(Debug, Clone)]
pub struct AmqpTransport {
    uri: String,
}

impl AmqpTransport {
    pub fn new(config: &AmqpConfig) -> Self {
        Self { uri: config.uri() }
    }
}

#[async_trait]
impl BrokerTransport for AmqpTransport {
    type Channel = AmqpChannel;

    async fn connect(&self) -> Result<AmqpChannel> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        Ok(AmqpChannel {
            connection,
            channel,
        })
    }
}

/// A channel together with the connection that owns it.
pub struct AmqpChannel {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn publish(&self, message: OutgoingMessage) -> Result<()> {
        let properties = BasicProperties::default()
            .with_content_type(ShortString::from(message.content_type))
            .with_headers(to_field_table(&message.headers));

        self.channel
            .basic_publish(
                &message.exchange,
                &message.routing_key,
                BasicPublishOptions::default(),
                &message.payload,
                properties,
            )
            .await?
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.channel.status().connected() {
            self.channel.close(REPLY_SUCCESS, "publisher closing").await?;
        }
        if self.connection.status().connected() {
            self.connection
                .close(REPLY_SUCCESS, "publisher closing")
                .await?;
        }
        Ok(())
    }
}

/// Converts message headers into an AMQP header table.
pub fn to_field_table(headers: &MessageHeaders) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in headers.iter() {
        table.insert(
            ShortString::from(key.to_string()),
            AMQPValue::LongString(LongString::from(value.to_string())),
        );
    }
    table
}
