//! In-memory relationship store for tests
//!
//! Same guard and change-stream semantics as [`crate::SqliteStore`], plus
//! fault injection so callers can exercise their retry paths.

use crate::StoreError;
use rapport_domain::{
    ChangeEvent, ConditionalWrite, EdgeKey, EventFilter, Identity, Mutation, RelationshipEdge,
    RelationshipStore, TransactOutcome, WriteOutcome, MAX_TRANSACTION_ITEMS,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    edges: BTreeMap<EdgeKey, RelationshipEdge>,
    log: Vec<ChangeEvent>,
    failing_writes: usize,
    conflicting_transactions: usize,
}

impl Inner {
    fn record(&mut self, key: &EdgeKey, mutation: Mutation) {
        let before = self.edges.get(key).cloned();
        match &mutation.after {
            Some(edge) => {
                self.edges.insert(key.clone(), edge.clone());
            }
            None => {
                self.edges.remove(key);
            }
        }

        let sequence = self.log.len() as u64 + 1;
        self.log.push(ChangeEvent {
            sequence,
            kind: mutation.kind,
            key: key.clone(),
            before,
            after: mutation.after,
        });
    }

    fn take_write_failure(&mut self) -> Result<(), StoreError> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

/// In-memory store implementing [`RelationshipStore`]
///
/// # Examples
///
/// ```
/// use rapport_domain::{ConditionalWrite, EdgeKey, EdgeState, RelationshipStore, WriteOutcome};
/// use rapport_store::MemoryStore;
///
/// let store = MemoryStore::new();
/// let write = ConditionalWrite::create(EdgeKey::new("p1", "p2"), EdgeState::Requested, 1);
/// assert_eq!(store.apply(&write).unwrap(), WriteOutcome::Applied);
/// assert_eq!(store.apply(&write).unwrap(), WriteOutcome::PreconditionFailed);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Make the next `count` writes (single or transactional) fail as unavailable
    pub fn fail_next_writes(&self, count: usize) -> Result<(), StoreError> {
        self.lock()?.failing_writes = count;
        Ok(())
    }

    /// Make the next `count` transactions abort with [`TransactOutcome::Conflict`]
    pub fn conflict_next_transactions(&self, count: usize) -> Result<(), StoreError> {
        self.lock()?.conflicting_transactions = count;
        Ok(())
    }

    /// Every change event committed so far, in order
    pub fn change_log(&self) -> Result<Vec<ChangeEvent>, StoreError> {
        Ok(self.lock()?.log.clone())
    }
}

impl RelationshipStore for MemoryStore {
    type Error = StoreError;

    fn get_edge(&self, key: &EdgeKey) -> Result<Option<RelationshipEdge>, Self::Error> {
        Ok(self.lock()?.edges.get(key).cloned())
    }

    fn list_edges(&self, owner: &Identity) -> Result<Vec<RelationshipEdge>, Self::Error> {
        Ok(self
            .lock()?
            .edges
            .values()
            .filter(|e| e.owner() == owner)
            .cloned()
            .collect())
    }

    fn apply(&self, write: &ConditionalWrite) -> Result<WriteOutcome, Self::Error> {
        let mut inner = self.lock()?;
        inner.take_write_failure()?;

        match write.evaluate(inner.edges.get(&write.key)) {
            Some(mutation) => {
                inner.record(&write.key, mutation);
                Ok(WriteOutcome::Applied)
            }
            None => Ok(WriteOutcome::PreconditionFailed),
        }
    }

    fn transact(&self, writes: &[ConditionalWrite]) -> Result<TransactOutcome, Self::Error> {
        if writes.len() > MAX_TRANSACTION_ITEMS {
            return Err(StoreError::TooManyItems {
                items: writes.len(),
                limit: MAX_TRANSACTION_ITEMS,
            });
        }
        let mut seen = HashSet::new();
        if !writes.iter().all(|w| seen.insert(&w.key)) {
            return Err(StoreError::InvalidData(
                "Transaction writes the same edge twice".to_string(),
            ));
        }

        let mut inner = self.lock()?;
        inner.take_write_failure()?;
        if inner.conflicting_transactions > 0 {
            inner.conflicting_transactions -= 1;
            return Ok(TransactOutcome::Conflict);
        }

        let mut staged = Vec::with_capacity(writes.len());
        let mut failed_legs = Vec::new();
        for (leg, write) in writes.iter().enumerate() {
            match write.evaluate(inner.edges.get(&write.key)) {
                Some(mutation) => staged.push((&write.key, mutation)),
                None => failed_legs.push(leg),
            }
        }

        if !failed_legs.is_empty() {
            return Ok(TransactOutcome::PreconditionFailed { failed_legs });
        }

        for (key, mutation) in staged {
            inner.record(key, mutation);
        }
        Ok(TransactOutcome::Committed)
    }

    fn read_changes(
        &self,
        after_sequence: u64,
        filter: &EventFilter,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>, Self::Error> {
        Ok(self
            .lock()?
            .log
            .iter()
            .filter(|e| e.sequence > after_sequence && filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }
}
