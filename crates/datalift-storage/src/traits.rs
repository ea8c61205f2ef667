//! Storage abstraction trait
//!
//! All object-storage backends implement [`ObjectStore`]. The pipeline needs
//! exactly three operations from a store: a size metadata lookup, an open
//! sequential read stream, and a create-or-overwrite write.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A sequential stream of object bytes.
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Object-storage abstraction.
///
/// Objects are addressed as `<bucket>/<key>`; keys may contain `/` and are
/// treated as opaque relative paths. Writes are create-or-overwrite with no
/// append, so reprocessing the same archive is idempotent.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Size in bytes of an object, via a metadata lookup that does not read
    /// the object body.
    async fn object_size(&self, bucket: &str, key: &str) -> StorageResult<u64>;

    /// Open a forward-only read stream over an object's bytes.
    async fn get_stream(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream>;

    /// Create or overwrite an object with the given content.
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Whether an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;
}
