//! Datalift Storage Library
//!
//! Object-storage abstraction for the archive pipeline: a sequential read
//! stream, a size metadata query, and create-or-overwrite writes, addressed
//! per bucket and key. Ships an S3-compatible backend (AWS S3, MinIO, and
//! other providers reachable through a custom endpoint) and a local
//! filesystem backend used by tests and the direct runner.

pub mod local;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;
pub use traits::{ObjectStore, ObjectStream, StorageError, StorageResult};
