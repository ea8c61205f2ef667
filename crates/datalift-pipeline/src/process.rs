//! Per-message archive processing.
//!
//! One invocation per inbound notification, strictly sequential inside:
//! size lookup, stream open, first-entry gating, in-order relocation, one
//! published load notice. Fan-out is non-transactional: entries written
//! before a later failure stay written, and reprocessing overwrites them.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::io::StreamReader;

use datalift_core::{ArchiveNotice, LoadNotice, NoticeError, PipelineSettings};
use datalift_queue::{QueueError, QueuePublisher};
use datalift_storage::ObjectStore;

use crate::archive::{ArchiveEntry, ArchiveStream};
use crate::error::PipelineError;
use crate::gate::{DirectoryGate, GateDecision};
use crate::notice::build_load_notice;

/// Terminal outcome of one invocation. Every variant is final for the
/// inbound message; only [`Outcome::Completed`] produces output.
#[derive(Debug)]
pub enum Outcome {
    /// Archive fully relocated and the load notice published.
    Completed(LoadNotice),
    /// Archive abandoned on a structural check; nothing written, nothing
    /// published.
    Rejected(RejectReason),
    /// Inbound notification unusable; logged and dropped.
    Dropped(&'static str),
}

/// Why an archive was rejected rather than processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The first non-hidden regular-file entry's directory failed the
    /// date-pattern check.
    InvalidDirectory { normalized: String },
    /// No entry ever established a top-level directory (empty archive or
    /// hidden files only).
    NoDatasetDirectory,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidDirectory { normalized } => {
                write!(f, "invalid top-level directory: {}", normalized)
            }
            RejectReason::NoDatasetDirectory => {
                write!(f, "archive established no top-level directory")
            }
        }
    }
}

/// The archive processing pipeline, shared across invocations.
///
/// Holds no per-archive state; each invocation owns its stream, gate, and
/// holdback buffer, so invocations can run concurrently without locking.
pub struct ArchivePipeline {
    store: Arc<dyn ObjectStore>,
    publisher: Arc<dyn QueuePublisher>,
    settings: PipelineSettings,
}

impl ArchivePipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn QueuePublisher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            publisher,
            settings,
        }
    }

    /// Process one inbound notification payload end to end.
    #[tracing::instrument(skip(self, payload))]
    pub async fn process_message(&self, payload: &[u8]) -> Result<Outcome, PipelineError> {
        let notice = match ArchiveNotice::from_payload(payload) {
            Ok(notice) => notice,
            Err(NoticeError::MissingField(field)) => {
                tracing::error!(field = field, "required field missing, dropping message");
                return Ok(Outcome::Dropped(field));
            }
            Err(NoticeError::Malformed(e)) => return Err(PipelineError::Payload(e)),
        };

        tracing::info!(
            key = %notice.name,
            bucket = %notice.bucket,
            "processing archive"
        );

        // Size of the original archive object, captured before extraction;
        // this is what the load notice carries, not the member total.
        let file_size = self
            .store
            .object_size(&notice.bucket, &notice.name)
            .await
            .map_err(PipelineError::Source)?;
        tracing::info!(size_bytes = file_size, "source archive size");

        let stream = self
            .store
            .get_stream(&notice.bucket, &notice.name)
            .await
            .map_err(PipelineError::Source)?;
        let reader = StreamReader::new(stream.map(|chunk| chunk.map_err(std::io::Error::other)));
        let mut entries = ArchiveStream::open(reader);

        let mut gate = DirectoryGate::new();
        // Hidden entries seen before the gate locks; flushed on acceptance so
        // a rejected archive writes nothing.
        let mut held: Vec<ArchiveEntry> = Vec::new();
        let mut relocated = 0usize;

        while let Some(result) = entries.next_entry().await {
            let entry = result.map_err(|e| PipelineError::Format(e.to_string()))?;
            if !entry.kind.is_file() {
                continue;
            }

            match gate.observe_file(&entry.path) {
                GateDecision::Rejected { normalized } => {
                    tracing::error!(
                        dir = %normalized,
                        key = %notice.name,
                        "invalid top-level directory, skipping archive"
                    );
                    return Ok(Outcome::Rejected(RejectReason::InvalidDirectory {
                        normalized,
                    }));
                }
                GateDecision::Hold => held.push(entry),
                GateDecision::Locked(dir) => {
                    tracing::info!(dataset_dir = %dir.normalized, "top-level directory locked");
                    for held_entry in held.drain(..) {
                        self.relocate(held_entry).await?;
                        relocated += 1;
                    }
                    self.relocate(entry).await?;
                    relocated += 1;
                }
                GateDecision::Pass => {
                    self.relocate(entry).await?;
                    relocated += 1;
                }
            }
        }

        let Some(dir) = gate.into_locked() else {
            tracing::error!(
                key = %notice.name,
                "archive established no top-level directory, skipping archive"
            );
            return Ok(Outcome::Rejected(RejectReason::NoDatasetDirectory));
        };

        tracing::info!(
            key = %notice.name,
            destination_bucket = %self.settings.destination_bucket,
            entries = relocated,
            "archive contents relocated"
        );

        let load = build_load_notice(&self.settings, &dir, &notice.bucket, file_size);
        let body = load
            .to_payload()
            .map_err(|e| PipelineError::Publish(QueueError::PublishFailed(e.to_string())))?;
        self.publisher.publish(&body).await?;

        tracing::info!(
            dataset_id = %load.dataset_id,
            table_id = %load.table_id,
            "load notice published"
        );

        Ok(Outcome::Completed(load))
    }

    async fn relocate(&self, entry: ArchiveEntry) -> Result<(), PipelineError> {
        let size = entry.data.len();
        self.store
            .put(&self.settings.destination_bucket, &entry.path, entry.data)
            .await
            .map_err(PipelineError::Destination)?;
        tracing::debug!(key = %entry.path, size_bytes = size, "entry relocated");
        Ok(())
    }
}
