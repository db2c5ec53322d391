//! Consumer of the ingress action queue

use crate::{QueueConfig, WorkerError, WorkerMetrics};
use rapport_domain::{now_millis, DeadLetter, DeliveryLedger, QueuedMessage, RelationshipStore};
use rapport_protocol::ActionProcessor;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::interval;

/// Source name for action queue metrics and dead letters
pub const ACTION_SOURCE: &str = "actions";

/// Receives action messages in batches and hands them to the [`ActionProcessor`]
///
/// Completed messages are acknowledged. Failed messages are released for
/// redelivery until they reach `max_receive_count`, or dead-lettered right
/// away when redelivery cannot help.
pub struct ActionWorker {
    config: QueueConfig,
    processor: ActionProcessor,
    metrics: WorkerMetrics,
}

impl ActionWorker {
    /// Create a worker with the given queue settings
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            processor: ActionProcessor,
            metrics: WorkerMetrics::new(),
        }
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }

    /// Receive and process one batch
    ///
    /// Returns the number of messages received.
    pub fn poll_once<S>(&mut self, store: &S) -> Result<usize, WorkerError>
    where
        S: RelationshipStore + DeliveryLedger,
    {
        let messages = store
            .receive(self.config.batch_size, self.config.visibility_timeout())
            .map_err(WorkerError::store)?;
        if messages.is_empty() {
            return Ok(0);
        }

        let response = self.processor.process_batch(store, &messages, now_millis());
        self.metrics.record_batch(ACTION_SOURCE, &response);

        for (message_id, _) in &response.outcomes {
            store.acknowledge(message_id).map_err(WorkerError::store)?;
        }

        for failure in &response.failures {
            let Some(message) = messages.iter().find(|m| m.message_id == failure.item_id) else {
                continue;
            };

            if failure.error.is_retryable() && message.receive_count < self.config.max_receive_count {
                tracing::debug!(
                    "releasing message {} (delivery {})",
                    message.message_id,
                    message.receive_count
                );
                store.release(&message.message_id).map_err(WorkerError::store)?;
            } else {
                self.dead_letter(store, message, &failure.error.to_string())?;
            }
        }

        Ok(messages.len())
    }

    fn dead_letter<S: DeliveryLedger>(
        &mut self,
        store: &S,
        message: &QueuedMessage,
        reason: &str,
    ) -> Result<(), WorkerError> {
        tracing::warn!(
            "dead-lettering message {} after {} deliveries: {}",
            message.message_id,
            message.receive_count,
            reason
        );

        let letter = DeadLetter {
            source: ACTION_SOURCE.to_string(),
            item_id: message.message_id.clone(),
            payload: message.body.clone(),
            reason: reason.to_string(),
            attempts: message.receive_count,
            created_at: now_millis(),
        };
        store.dead_letter(&letter).map_err(WorkerError::store)?;
        store.acknowledge(&message.message_id).map_err(WorkerError::store)?;
        self.metrics.record_dead_letters(ACTION_SOURCE, 1);
        Ok(())
    }

    /// Poll the queue until the shutdown signal fires
    ///
    /// Returns the metrics collected over the worker's lifetime.
    pub async fn run<S>(
        mut self,
        store: Arc<S>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<WorkerMetrics, WorkerError>
    where
        S: RelationshipStore + DeliveryLedger,
    {
        let mut ticker = interval(self.config.poll_interval());
        tracing::info!(
            "Action worker started (batch: {}, interval: {:?})",
            self.config.batch_size,
            self.config.poll_interval()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once(store.as_ref()) {
                        tracing::error!("Action poll failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Shutdown signal received, stopping action worker");
                    break;
                }
            }
        }

        Ok(self.metrics)
    }
}
