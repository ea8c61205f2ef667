use crate::traits::{QueueConsumer, QueueError, QueueMessage, QueuePublisher, QueueResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;

const MAX_BATCH: i32 = 10;

/// SQS queue implementation
///
/// One instance is bound to one queue URL; the same type serves as consumer
/// (input queue) and publisher (output queue). Unacknowledged messages
/// reappear after the queue's visibility timeout.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    wait_time_secs: i32,
}

impl SqsQueue {
    /// Create a new SqsQueue bound to `queue_url`.
    ///
    /// `wait_time_secs` is the long-poll wait for receives; publishers may
    /// pass zero.
    pub async fn new(
        queue_url: String,
        region: String,
        wait_time_secs: u64,
    ) -> QueueResult<Self> {
        let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config)
            .load()
            .await;

        Ok(SqsQueue {
            client: Client::new(&config),
            queue_url,
            wait_time_secs: wait_time_secs.min(20) as i32,
        })
    }
}

#[async_trait]
impl QueueConsumer for SqsQueue {
    async fn receive(&self) -> QueueResult<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(MAX_BATCH)
            .wait_time_seconds(self.wait_time_secs)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, queue_url = %self.queue_url, "SQS receive failed");
                QueueError::ReceiveFailed(e.to_string())
            })?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|m| {
                let receipt = m.receipt_handle()?.to_string();
                Some(QueueMessage {
                    id: m.message_id().unwrap_or_default().to_string(),
                    receipt,
                    payload: m.body().unwrap_or_default().as_bytes().to_vec(),
                })
            })
            .collect();

        Ok(messages)
    }

    async fn acknowledge(&self, receipt: &str) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, queue_url = %self.queue_url, "SQS delete failed");
                QueueError::AcknowledgeFailed(e.to_string())
            })?;

        Ok(())
    }
}

#[async_trait]
impl QueuePublisher for SqsQueue {
    async fn publish(&self, payload: &[u8]) -> QueueResult<()> {
        let body = String::from_utf8(payload.to_vec())
            .map_err(|e| QueueError::PublishFailed(format!("payload is not UTF-8: {}", e)))?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, queue_url = %self.queue_url, "SQS publish failed");
                QueueError::PublishFailed(e.to_string())
            })?;

        tracing::info!(
            queue_url = %self.queue_url,
            size_bytes = payload.len(),
            "SQS publish successful"
        );

        Ok(())
    }
}
