//! datalift — relocate archived datasets from a landing bucket and notify
//! the downstream loader.
//!
//! Per-pipeline settings are flags; backend selection and credentials come
//! from the environment (see `BackendConfig`).

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use datalift_cli::init_tracing;
use datalift_core::{
    BackendConfig, PipelineSettings, QueueBackend, RunnerMode, StorageBackend,
};
use datalift_pipeline::{ArchivePipeline, RunnerConfig, WorkerRunner};
use datalift_queue::{InMemoryQueue, QueueConsumer, QueuePublisher, SqsQueue};
use datalift_storage::{LocalObjectStore, ObjectStore, S3ObjectStore};

#[derive(Parser)]
#[command(
    name = "datalift",
    about = "Relocate archived datasets from a landing bucket and notify the loader"
)]
struct Cli {
    /// Cloud project identifier stamped into load notices
    #[arg(long)]
    project: String,

    /// Destination bucket for extracted archive members
    #[arg(long)]
    destination_bucket: String,

    /// Target table identifier stamped into load notices
    #[arg(long)]
    table: String,

    /// Input queue carrying archive-landed notifications
    #[arg(long)]
    topic: String,

    /// Output queue for load notices
    #[arg(long)]
    output_topic: String,

    /// Execution mode: "direct" (sequential) or "pool" (concurrent)
    #[arg(long, default_value = "direct")]
    runner: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let runner_mode: RunnerMode = cli.runner.parse()?;
    let backends = BackendConfig::from_env().context("Failed to load backend configuration")?;

    let store: Arc<dyn ObjectStore> = match backends.storage_backend {
        StorageBackend::S3 => {
            let region = backends
                .s3_region
                .clone()
                .context("S3_REGION or AWS_REGION must be set for the S3 storage backend")?;
            Arc::new(S3ObjectStore::new(region, backends.s3_endpoint.clone()).await?)
        }
        StorageBackend::Local => {
            let root = backends
                .local_storage_path
                .clone()
                .context("LOCAL_STORAGE_PATH must be set for the local storage backend")?;
            Arc::new(LocalObjectStore::new(root).await?)
        }
    };

    let (consumer, publisher): (Arc<dyn QueueConsumer>, Arc<dyn QueuePublisher>) =
        match backends.queue_backend {
            QueueBackend::Sqs => {
                let region = backends
                    .s3_region
                    .clone()
                    .context("AWS_REGION must be set for the SQS queue backend")?;
                let consumer =
                    SqsQueue::new(cli.topic.clone(), region.clone(), backends.poll_wait_secs)
                        .await?;
                let publisher = SqsQueue::new(cli.output_topic.clone(), region, 0).await?;
                (Arc::new(consumer), Arc::new(publisher))
            }
            QueueBackend::Memory => {
                // Both ends in-process; only useful for local smoke runs.
                (
                    Arc::new(InMemoryQueue::new()),
                    Arc::new(InMemoryQueue::new()),
                )
            }
        };

    let settings = PipelineSettings {
        project_id: cli.project,
        table_id: cli.table,
        destination_bucket: cli.destination_bucket,
    };

    tracing::info!(
        project_id = %settings.project_id,
        table_id = %settings.table_id,
        destination_bucket = %settings.destination_bucket,
        input_queue = %cli.topic,
        output_queue = %cli.output_topic,
        runner = %cli.runner,
        "datalift starting"
    );

    let pipeline = Arc::new(ArchivePipeline::new(store, publisher, settings));
    let runner = WorkerRunner::new(
        consumer,
        pipeline,
        RunnerConfig {
            mode: runner_mode,
            max_workers: backends.pool_max_workers,
            idle_poll_interval_ms: backends.idle_poll_interval_ms,
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(()).await;
        }
    });

    runner.run(shutdown_rx).await;

    Ok(())
}
