//! Message and value types flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// Inbound notification that a compressed archive landed in a bucket.
///
/// Produced by the storage service's notification hook, consumed once per
/// pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArchiveNotice {
    /// Object key of the archive within the source bucket.
    pub name: String,
    /// Bucket the archive landed in.
    pub bucket: String,
}

/// Parse failure for an inbound notification payload.
#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("notification payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("required field missing from notification: {0}")]
    MissingField(&'static str),
}

impl ArchiveNotice {
    /// Parse an inbound queue payload.
    ///
    /// A payload that is not JSON at all is `Malformed`; a JSON document
    /// without a string `name` or `bucket` is `MissingField`. Callers drop
    /// the latter silently and propagate the former for redelivery.
    pub fn from_payload(payload: &[u8]) -> Result<Self, NoticeError> {
        let value: serde_json::Value = serde_json::from_slice(payload)?;
        let name = required_str(&value, "name")?;
        let bucket = required_str(&value, "bucket")?;
        Ok(Self { name, bucket })
    }
}

fn required_str(value: &serde_json::Value, key: &'static str) -> Result<String, NoticeError> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or(NoticeError::MissingField(key))
}

/// Top-level directory of an archive, established at most once per archive
/// from its first non-hidden regular-file entry.
///
/// `normalized` has dashes replaced by underscores and doubles as the dataset
/// identifier; `original` is the path segment exactly as it appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDir {
    pub normalized: String,
    pub original: String,
}

/// Outbound notice for the downstream loader. Exactly one is published per
/// successfully processed archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadNotice {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    pub original_date: String,
    pub source_bucket: String,
    pub destination_bucket: String,
    /// Size in bytes of the original archive object, not of its members.
    pub file_size: u64,
}

impl LoadNotice {
    /// Serialize to the UTF-8 JSON wire form.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
