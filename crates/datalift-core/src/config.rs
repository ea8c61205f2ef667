//! Configuration module
//!
//! Per-pipeline settings come from the command line; backend selection and
//! credentials come from the environment, read once at startup.

use std::env;
use std::str::FromStr;

const POOL_MAX_WORKERS: usize = 4;
const POLL_WAIT_SECS: u64 = 10;
const IDLE_POLL_INTERVAL_MS: u64 = 500;

/// Execution mode for the worker runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerMode {
    /// Process messages one at a time on the polling task.
    Direct,
    /// Dispatch messages to a semaphore-bounded worker pool.
    Pool,
}

impl FromStr for RunnerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(RunnerMode::Direct),
            "pool" => Ok(RunnerMode::Pool),
            _ => Err(anyhow::anyhow!("Unsupported runner mode: {}", s)),
        }
    }
}

/// Static settings stamped into every load notice, fixed per pipeline
/// instance at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub project_id: String,
    pub table_id: String,
    pub destination_bucket: String,
}

/// Object-storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Queue transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Sqs,
    Memory,
}

/// Backend wiring read from the environment.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub storage_backend: StorageBackend,
    pub queue_backend: QueueBackend,
    /// Region for the S3-compatible store (S3_REGION, falling back to AWS_REGION).
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, interop gateways).
    pub s3_endpoint: Option<String>,
    /// Root directory for the local storage backend; buckets are subdirectories.
    pub local_storage_path: Option<String>,
    pub pool_max_workers: usize,
    /// Long-poll wait passed to the queue transport.
    pub poll_wait_secs: u64,
    /// Sleep between polls when a receive returns no messages.
    pub idle_poll_interval_ms: u64,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("DATALIFT_STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_lowercase()
            .as_str()
        {
            "s3" => StorageBackend::S3,
            "local" => StorageBackend::Local,
            other => {
                return Err(anyhow::anyhow!(
                    "DATALIFT_STORAGE_BACKEND must be 's3' or 'local', got '{}'",
                    other
                ))
            }
        };

        let queue_backend = match env::var("DATALIFT_QUEUE_BACKEND")
            .unwrap_or_else(|_| "sqs".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqs" => QueueBackend::Sqs,
            "memory" => QueueBackend::Memory,
            other => {
                return Err(anyhow::anyhow!(
                    "DATALIFT_QUEUE_BACKEND must be 'sqs' or 'memory', got '{}'",
                    other
                ))
            }
        };

        let config = BackendConfig {
            storage_backend,
            queue_backend,
            s3_region: env::var("S3_REGION").or_else(|_| env::var("AWS_REGION")).ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            pool_max_workers: env::var("POOL_MAX_WORKERS")
                .unwrap_or_else(|_| POOL_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(POOL_MAX_WORKERS),
            poll_wait_secs: env::var("POLL_WAIT_SECS")
                .unwrap_or_else(|_| POLL_WAIT_SECS.to_string())
                .parse()
                .unwrap_or(POLL_WAIT_SECS),
            idle_poll_interval_ms: env::var("IDLE_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| IDLE_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(IDLE_POLL_INTERVAL_MS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using the S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using the local storage backend"
                    ));
                }
            }
        }
        Ok(())
    }
}
