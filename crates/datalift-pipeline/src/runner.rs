//! Worker runner: queue polling and dispatch.
//!
//! Each inbound message is an independent unit of work. The direct mode
//! processes units one at a time on the polling task; the pool mode
//! dispatches them to spawned tasks behind a semaphore. Messages are
//! acknowledged on every terminal outcome and left for redelivery on
//! propagated failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

use datalift_core::RunnerMode;
use datalift_queue::{QueueConsumer, QueueMessage};

use crate::process::{ArchivePipeline, Outcome};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub mode: RunnerMode,
    pub max_workers: usize,
    /// Sleep between polls when a receive returns no messages.
    pub idle_poll_interval_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: RunnerMode::Direct,
            max_workers: 4,
            idle_poll_interval_ms: 500,
        }
    }
}

pub struct WorkerRunner {
    consumer: Arc<dyn QueueConsumer>,
    pipeline: Arc<ArchivePipeline>,
    config: RunnerConfig,
}

impl WorkerRunner {
    pub fn new(
        consumer: Arc<dyn QueueConsumer>,
        pipeline: Arc<ArchivePipeline>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            consumer,
            pipeline,
            config,
        }
    }

    /// Poll and dispatch until `shutdown_rx` fires. In-flight pool workers
    /// finish their current message; nothing new is claimed after shutdown.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            mode = ?self.config.mode,
            max_workers = self.config.max_workers,
            "worker runner started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let idle = Duration::from_millis(self.config.idle_poll_interval_ms);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("worker runner shutting down");
                    break;
                }
                batch = self.consumer.receive() => {
                    match batch {
                        Ok(messages) if messages.is_empty() => sleep(idle).await,
                        Ok(messages) => self.dispatch(messages, &semaphore).await,
                        Err(e) => {
                            tracing::error!(error = %e, "queue receive failed");
                            sleep(idle).await;
                        }
                    }
                }
            }
        }

        tracing::info!("worker runner stopped");
    }

    async fn dispatch(&self, messages: Vec<QueueMessage>, semaphore: &Arc<Semaphore>) {
        for message in messages {
            match self.config.mode {
                RunnerMode::Direct => {
                    handle_message(self.pipeline.clone(), self.consumer.clone(), message).await;
                }
                RunnerMode::Pool => {
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return,
                    };
                    let pipeline = self.pipeline.clone();
                    let consumer = self.consumer.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        handle_message(pipeline, consumer, message).await;
                    });
                }
            }
        }
    }
}

async fn handle_message(
    pipeline: Arc<ArchivePipeline>,
    consumer: Arc<dyn QueueConsumer>,
    message: QueueMessage,
) {
    match pipeline.process_message(&message.payload).await {
        Ok(outcome) => {
            // Completed, Rejected and Dropped are all terminal for this
            // message: acknowledge so the transport does not redeliver.
            if let Err(e) = consumer.acknowledge(&message.receipt).await {
                tracing::error!(error = %e, message_id = %message.id, "acknowledge failed");
            }
            if let Outcome::Completed(notice) = outcome {
                tracing::info!(
                    message_id = %message.id,
                    dataset_id = %notice.dataset_id,
                    "archive processed"
                );
            }
        }
        Err(e) => {
            // Leave unacknowledged; the transport's redelivery policy owns
            // the retry.
            tracing::error!(error = %e, message_id = %message.id, "archive processing failed");
        }
    }
}
