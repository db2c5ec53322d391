//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the relationship protocol and
//! the infrastructure it runs on. Implementations live in `rapport-store`.

use crate::{
    ChangeEvent, ConditionalWrite, EdgeKey, EventFilter, Identity, RelationshipEdge, Timestamp,
    TransactOutcome, WriteOutcome,
};
use std::time::Duration;

/// Partitioned edge store with guarded writes and a change stream
///
/// Every committed write appends exactly one [`ChangeEvent`] in the same
/// atomic commit. A guard that does not hold is an `Ok` outcome; `Err` is
/// reserved for transport failures (timeouts, unavailability, corruption).
///
/// Implementations are shared across concurrent workers, so every method
/// takes `&self`.
pub trait RelationshipStore: Send + Sync {
    /// Error type for transport failures
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read one edge; `None` when no edge is recorded in this direction
    fn get_edge(&self, key: &EdgeKey) -> Result<Option<RelationshipEdge>, Self::Error>;

    /// Read every edge owned by an identity, ordered by peer
    fn list_edges(&self, owner: &Identity) -> Result<Vec<RelationshipEdge>, Self::Error>;

    /// Apply a single guarded write
    fn apply(&self, write: &ConditionalWrite) -> Result<WriteOutcome, Self::Error>;

    /// Apply several guarded writes atomically (all or nothing)
    ///
    /// Limited to [`crate::MAX_TRANSACTION_ITEMS`] legs.
    fn transact(&self, writes: &[ConditionalWrite]) -> Result<TransactOutcome, Self::Error>;

    /// Read committed change events after `after_sequence` that pass `filter`
    fn read_changes(
        &self,
        after_sequence: u64,
        filter: &EventFilter,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>, Self::Error>;
}

/// A message delivered from the ingress action queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Queue-assigned message identifier
    pub message_id: String,

    /// Raw message body
    pub body: String,

    /// How many times this message has been received, including this delivery
    pub receive_count: u32,
}

/// An item that exhausted its retries, kept for manual inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// Where the item came from (queue or stream consumer name)
    pub source: String,

    /// Message id or event sequence number
    pub item_id: String,

    /// Original payload, rendered as text
    pub payload: String,

    /// Last failure observed
    pub reason: String,

    /// Delivery attempts made
    pub attempts: u32,

    /// When the item was dead-lettered
    pub created_at: Timestamp,
}

/// At-least-once delivery bookkeeping: action queue, stream checkpoints and
/// the dead-letter destination
pub trait DeliveryLedger: Send + Sync {
    /// Error type for ledger operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append an action message to the queue, returning its id
    fn enqueue(&self, body: &str) -> Result<String, Self::Error>;

    /// Receive up to `max` visible messages, hiding them for `visibility`
    fn receive(&self, max: usize, visibility: Duration) -> Result<Vec<QueuedMessage>, Self::Error>;

    /// Remove a successfully processed message
    fn acknowledge(&self, message_id: &str) -> Result<(), Self::Error>;

    /// Make a message visible again for redelivery
    fn release(&self, message_id: &str) -> Result<(), Self::Error>;

    /// Last sequence a stream consumer has fully processed (0 if none)
    fn checkpoint(&self, consumer: &str) -> Result<u64, Self::Error>;

    /// Record the last sequence a stream consumer has fully processed
    fn commit_checkpoint(&self, consumer: &str, sequence: u64) -> Result<(), Self::Error>;

    /// Divert an item to the dead-letter destination
    fn dead_letter(&self, letter: &DeadLetter) -> Result<(), Self::Error>;

    /// Most recent dead letters, newest first
    fn dead_letters(&self, limit: usize) -> Result<Vec<DeadLetter>, Self::Error>;
}
