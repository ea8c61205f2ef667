//! Pipeline error taxonomy.

use thiserror::Error;

use datalift_queue::QueueError;
use datalift_storage::StorageError;

/// Failures that abort one archive's processing and propagate to the runner.
///
/// None of these are handled locally: the inbound message stays
/// unacknowledged and the transport's redelivery policy decides what happens
/// next. Rejections and required-field drops are not errors; they are
/// terminal outcomes (see [`crate::process::Outcome`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source archive could not be opened or its size queried.
    #[error("source archive unavailable: {0}")]
    Source(#[source] StorageError),

    /// The source stream is not a valid gzip-compressed tar. Entries
    /// relocated before the malformed bytes were reached remain written.
    #[error("archive format error: {0}")]
    Format(String),

    /// A destination write failed mid-archive; earlier writes remain.
    #[error("destination write failed: {0}")]
    Destination(#[source] StorageError),

    /// The inbound payload was not valid JSON.
    #[error("malformed notification payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Publishing the load notice failed.
    #[error("load notice publish failed: {0}")]
    Publish(#[from] QueueError),
}
