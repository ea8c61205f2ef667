use crate::traits::{QueueConsumer, QueueError, QueueMessage, QueuePublisher, QueueResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_BATCH: usize = 10;

/// In-memory queue implementation
///
/// Models at-least-once delivery: received messages move to an in-flight set
/// and stay there until acknowledged; [`InMemoryQueue::redeliver`] plays the
/// role of a visibility-timeout expiry. Used by tests and the local runner.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    ready: VecDeque<QueueMessage>,
    inflight: HashMap<String, QueueMessage>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all unacknowledged in-flight messages to the front of the
    /// queue, as a visibility-timeout expiry would.
    pub async fn redeliver(&self) {
        let mut state = self.inner.lock().await;
        let mut returned: Vec<QueueMessage> = state.inflight.drain().map(|(_, m)| m).collect();
        returned.sort_by(|a, b| a.id.cmp(&b.id));
        for message in returned.into_iter().rev() {
            state.ready.push_front(message);
        }
    }

    /// Number of messages waiting for delivery.
    pub async fn ready_len(&self) -> usize {
        self.inner.lock().await.ready.len()
    }

    /// Number of delivered but unacknowledged messages.
    pub async fn inflight_len(&self) -> usize {
        self.inner.lock().await.inflight.len()
    }
}

#[async_trait]
impl QueueConsumer for InMemoryQueue {
    async fn receive(&self) -> QueueResult<Vec<QueueMessage>> {
        let mut state = self.inner.lock().await;
        let mut batch = Vec::new();
        while batch.len() < MAX_BATCH {
            match state.ready.pop_front() {
                Some(message) => {
                    state
                        .inflight
                        .insert(message.receipt.clone(), message.clone());
                    batch.push(message);
                }
                None => break,
            }
        }
        Ok(batch)
    }

    async fn acknowledge(&self, receipt: &str) -> QueueResult<()> {
        let mut state = self.inner.lock().await;
        state
            .inflight
            .remove(receipt)
            .map(|_| ())
            .ok_or_else(|| QueueError::AcknowledgeFailed(format!("unknown receipt: {}", receipt)))
    }
}

#[async_trait]
impl QueuePublisher for InMemoryQueue {
    async fn publish(&self, payload: &[u8]) -> QueueResult<()> {
        let mut state = self.inner.lock().await;
        state.next_id += 1;
        let id = format!("{:08}", state.next_id);
        state.ready.push_back(QueueMessage {
            receipt: id.clone(),
            id,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
