//! Datalift Core Library
//!
//! Domain models and configuration shared by the datalift crates: inbound
//! archive notifications, outbound load notices, the locked dataset
//! directory, and environment-driven backend configuration.

pub mod config;
pub mod models;

// Re-export commonly used types
pub use config::{BackendConfig, PipelineSettings, QueueBackend, RunnerMode, StorageBackend};
pub use models::{ArchiveNotice, DatasetDir, LoadNotice, NoticeError};
