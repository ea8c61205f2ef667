//! Datalift Queue Library
//!
//! Message transport abstraction for the archive pipeline: a consumer side
//! with explicit acknowledgement (unacknowledged messages are redelivered by
//! the transport) and a publisher side for load notices. Ships an SQS
//! backend and an in-memory backend used by tests and the local runner.

pub mod memory;
pub mod sqs;
pub mod traits;

// Re-export commonly used types
pub use memory::InMemoryQueue;
pub use sqs::SqsQueue;
pub use traits::{QueueConsumer, QueueError, QueueMessage, QueuePublisher, QueueResult};
