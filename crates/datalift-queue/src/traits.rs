//! Queue transport traits
//!
//! The pipeline is driven by at-least-once delivery: a message stays
//! invisible while in flight and is redelivered unless acknowledged. The
//! pipeline itself schedules no retries; redelivery policy belongs entirely
//! to the transport behind these traits.

use async_trait::async_trait;
use thiserror::Error;

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Acknowledge failed: {0}")]
    AcknowledgeFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// One delivered message.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Transport-assigned message identifier, for logging.
    pub id: String,
    /// Delivery receipt used to acknowledge this particular delivery.
    pub receipt: String,
    pub payload: Vec<u8>,
}

/// Consumer side of a queue.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Poll the queue, returning zero or more messages. Implementations may
    /// long-poll; an empty result is not an error.
    async fn receive(&self) -> QueueResult<Vec<QueueMessage>>;

    /// Acknowledge a delivery so the message is not redelivered.
    async fn acknowledge(&self, receipt: &str) -> QueueResult<()>;
}

/// Publisher side of a queue.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// Publish one message payload.
    async fn publish(&self, payload: &[u8]) -> QueueResult<()>;
}
