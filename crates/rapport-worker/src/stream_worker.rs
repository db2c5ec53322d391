//! Consumer of the change stream for one propagator

use crate::{StreamConfig, WorkerError, WorkerMetrics};
use rapport_domain::{now_millis, ChangeEvent, DeadLetter, DeliveryLedger, RelationshipStore};
use rapport_protocol::{Propagator, Transition};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::interval;

/// Reads the filtered change stream after a stored checkpoint and runs one
/// propagator over it
///
/// A batch with failures rewinds the checkpoint to just before the lowest
/// failed event, so it and everything after it are read again. Once that
/// event has failed more than `retry_attempts` times, the batch's failures
/// are dead-lettered and the checkpoint moves past the batch.
pub struct PropagationWorker {
    transition: Transition,
    config: StreamConfig,
    metrics: WorkerMetrics,
    /// Lowest failed sequence of the last batch, with its failure count
    head_failure: Option<(u64, u32)>,
}

impl PropagationWorker {
    /// Create a worker for one propagation path
    pub fn new(transition: Transition, config: StreamConfig) -> Self {
        Self {
            transition,
            config,
            metrics: WorkerMetrics::new(),
            head_failure: None,
        }
    }

    /// Checkpoint and dead-letter name of this consumer
    pub fn consumer(&self) -> &'static str {
        self.transition.name()
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }

    /// Read and propagate one batch
    ///
    /// Returns the number of events read.
    pub fn poll_once<S>(&mut self, store: &S) -> Result<usize, WorkerError>
    where
        S: RelationshipStore + DeliveryLedger,
    {
        let consumer = self.consumer();
        let checkpoint = store.checkpoint(consumer).map_err(WorkerError::store)?;
        let events = store
            .read_changes(checkpoint, &self.transition.filter(), self.config.batch_size)
            .map_err(WorkerError::store)?;
        let Some(last) = events.last().map(|e| e.sequence) else {
            return Ok(0);
        };

        let response = self.transition.handle_batch(store, &events, now_millis());
        self.metrics.record_batch(consumer, &response);

        if response.is_success() {
            self.head_failure = None;
            store
                .commit_checkpoint(consumer, last)
                .map_err(WorkerError::store)?;
            return Ok(events.len());
        }

        let failed_ids = response.failed_ids();
        let failed: Vec<&ChangeEvent> = events
            .iter()
            .filter(|e| failed_ids.contains(&e.sequence.to_string().as_str()))
            .collect();
        let lowest = failed.iter().map(|e| e.sequence).min().unwrap_or(last);

        let attempts = match self.head_failure {
            Some((sequence, count)) if sequence == lowest => count + 1,
            _ => 1,
        };
        let retryable = response.failures.iter().any(|f| f.error.is_retryable());

        if retryable && attempts <= self.config.retry_attempts {
            tracing::warn!(
                "{} rewinding to event {} (attempt {})",
                consumer,
                lowest,
                attempts
            );
            self.head_failure = Some((lowest, attempts));
            store
                .commit_checkpoint(consumer, lowest.saturating_sub(1))
                .map_err(WorkerError::store)?;
        } else {
            for failure in &response.failures {
                let Some(event) = failed
                    .iter()
                    .find(|e| e.sequence.to_string() == failure.item_id)
                else {
                    continue;
                };
                self.dead_letter(store, event, &failure.error.to_string(), attempts)?;
            }
            self.head_failure = None;
            store
                .commit_checkpoint(consumer, last)
                .map_err(WorkerError::store)?;
        }

        Ok(events.len())
    }

    fn dead_letter<S: DeliveryLedger>(
        &mut self,
        store: &S,
        event: &ChangeEvent,
        reason: &str,
        attempts: u32,
    ) -> Result<(), WorkerError> {
        let consumer = self.consumer();
        tracing::warn!(
            "{} dead-lettering event {} after {} attempts: {}",
            consumer,
            event.sequence,
            attempts,
            reason
        );

        let letter = DeadLetter {
            source: consumer.to_string(),
            item_id: event.sequence.to_string(),
            payload: event_payload(event),
            reason: reason.to_string(),
            attempts,
            created_at: now_millis(),
        };
        store.dead_letter(&letter).map_err(WorkerError::store)?;
        self.metrics.record_dead_letters(consumer, 1);
        Ok(())
    }

    /// Poll the stream until the shutdown signal fires
    ///
    /// A full batch is followed immediately by another poll.
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
            "{} propagator started (batch: {}, interval: {:?})",
            self.consumer(),
            self.config.batch_size,
            self.config.poll_interval()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    loop {
                        match self.poll_once(store.as_ref()) {
                            Ok(read) if read == self.config.batch_size && self.head_failure.is_none() => continue,
                            Ok(_) => break,
                            Err(e) => {
                                tracing::error!("{} poll failed: {}", self.consumer(), e);
                                break;
                            }
                        }
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Shutdown signal received, stopping {} propagator", self.consumer());
                    break;
                }
            }
        }

        Ok(self.metrics)
    }
}

/// JSON image of an event for the dead-letter table
fn event_payload(event: &ChangeEvent) -> String {
    let image = |edge: &Option<rapport_domain::RelationshipEdge>| {
        edge.as_ref().map(|e| {
            serde_json::json!({
                "owner": e.owner().as_str(),
                "peer": e.peer().as_str(),
                "state": e.state.as_str(),
                "last_updated": e.last_updated,
            })
        })
    };

    serde_json::json!({
        "sequence": event.sequence,
        "event_type": event.kind.as_str(),
        "owner": event.key.owner.as_str(),
        "peer": event.key.peer.as_str(),
        "before": image(&event.before),
        "after": image(&event.after),
    })
    .to_string()
}
