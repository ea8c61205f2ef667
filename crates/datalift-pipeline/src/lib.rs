//! Datalift Pipeline Library
//!
//! The streaming archive relocation pipeline: decode a gzip-compressed tar
//! stream incrementally, gate the whole archive on its top-level directory
//! name, relocate every member file to the destination bucket, and publish
//! exactly one load notice per processed archive. The worker runner drives
//! one pipeline invocation per inbound queue message.

pub mod archive;
pub mod error;
pub mod gate;
pub mod notice;
pub mod process;
pub mod runner;

// Re-export commonly used types
pub use archive::{ArchiveEntry, ArchiveError, ArchiveStream, EntryKind};
pub use error::PipelineError;
pub use gate::{DirectoryGate, GateDecision};
pub use notice::build_load_notice;
pub use process::{ArchivePipeline, Outcome, RejectReason};
pub use runner::{RunnerConfig, WorkerRunner};
