//! Collaborator error types.

use thiserror::Error;

/// Errors raised by the cart, catalog and broker collaborators.
///
/// Callers in the checkout pipeline only distinguish success from failure;
/// the variants exist for logging.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP request could not be completed (connect, timeout, body read).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The collaborator answered with an error status.
    #[error("{url} responded with status {status}")]
    Status { status: u16, url: String },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// AMQP connection or channel error.
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    /// The broker connection could not be established.
    #[error("Broker connection failed: {0}")]
    Connection(String),

    /// The broker channel is closed.
    #[error("Broker channel is closed")]
    ChannelClosed,

    /// The broker refused the message.
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Convenience type alias for collaborator results.
pub type Result<T> = std::result::Result<T, ClientError>;
