//! Rapport Storage Layer
//!
//! Implements the `RelationshipStore` and `DeliveryLedger` traits on SQLite.
//!
//! # Architecture
//!
//! - `relationships`: one row per directional edge, keyed by `(owner, peer)`
//! - `change_events`: the change stream, appended in the same transaction as
//!   the edge write it describes
//! - `stream_checkpoints`, `action_queue`, `dead_letters`: delivery bookkeeping
//!
//! Every write runs in a `BEGIN IMMEDIATE` transaction: the guard is evaluated
//! and the write committed under the database's write lock, so two workers can
//! never both see a guard hold for the same edge.
//!
//! # Examples
//!
//! ```no_run
//! use rapport_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for edge operations
//! ```

#![warn(missing_docs)]

mod ledger;
mod memory;

pub use memory::MemoryStore;

use rapport_domain::{
    ChangeEvent, ChangeKind, ConditionalWrite, EdgeKey, EdgeState, EventFilter, Identity,
    Mutation, RelationshipEdge, RelationshipStore, TransactOutcome, WriteOutcome,
    MAX_TRANSACTION_ITEMS,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Default time a write waits for another connection's lock
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A thread panicked while holding the connection
    #[error("Store connection lock poisoned")]
    Poisoned,

    /// Transaction exceeds the leg limit
    #[error("Transaction has {items} items, limit is {limit}")]
    TooManyItems {
        /// Legs requested
        items: usize,
        /// Maximum legs allowed
        limit: usize,
    },
}

/// SQLite-based implementation of the relationship store
///
/// One instance is opened per process and shared by every worker through an
/// `Arc`. The connection sits behind a mutex; the store carries no protocol
/// state of its own.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rapport_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("rapport.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open a store, waiting up to `busy_timeout` for locks held by other connections
    pub fn with_busy_timeout<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        // readers in other processes see committed writes
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Highest sequence number in the change stream (0 when empty)
    pub fn latest_sequence(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let sequence: i64 =
            conn.query_row("SELECT COALESCE(MAX(sequence), 0) FROM change_events", [], |row| {
                row.get(0)
            })?;
        Ok(sequence as u64)
    }
}

fn parse_state(s: &str) -> Result<EdgeState, StoreError> {
    EdgeState::parse(s).ok_or_else(|| StoreError::InvalidData(format!("Unknown edge state: {}", s)))
}

fn parse_kind(s: &str) -> Result<ChangeKind, StoreError> {
    ChangeKind::parse(s).ok_or_else(|| StoreError::InvalidData(format!("Unknown event type: {}", s)))
}

/// Wrap a store error so it can escape a rusqlite row-mapping closure
fn conversion_error(column: usize, e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

/// Whether the error means another connection holds the lock
fn is_contention(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn read_edge(conn: &Connection, key: &EdgeKey) -> Result<Option<RelationshipEdge>, StoreError> {
    let row = conn
        .query_row(
            "SELECT state, last_updated FROM relationships WHERE owner = ?1 AND peer = ?2",
            params![key.owner.as_str(), key.peer.as_str()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;

    row.map(|(state, last_updated)| {
        Ok(RelationshipEdge::new(key.clone(), parse_state(&state)?, last_updated as u64))
    })
    .transpose()
}

/// Write the mutation and its change event; caller owns the transaction
fn record(
    conn: &Connection,
    key: &EdgeKey,
    before: Option<&RelationshipEdge>,
    mutation: &Mutation,
) -> Result<(), StoreError> {
    match &mutation.after {
        Some(edge) => {
            conn.execute(
                "INSERT INTO relationships (owner, peer, state, last_updated)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner, peer) DO UPDATE SET
                 state = excluded.state, last_updated = excluded.last_updated",
                params![
                    key.owner.as_str(),
                    key.peer.as_str(),
                    edge.state.as_str(),
                    edge.last_updated as i64,
                ],
            )?;
        }
        None => {
            conn.execute(
                "DELETE FROM relationships WHERE owner = ?1 AND peer = ?2",
                params![key.owner.as_str(), key.peer.as_str()],
            )?;
        }
    }

    conn.execute(
        "INSERT INTO change_events
         (event_type, owner, peer, old_state, old_last_updated, new_state, new_last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            mutation.kind.as_str(),
            key.owner.as_str(),
            key.peer.as_str(),
            before.map(|e| e.state.as_str()),
            before.map(|e| e.last_updated as i64),
            mutation.after.as_ref().map(|e| e.state.as_str()),
            mutation.after.as_ref().map(|e| e.last_updated as i64),
        ],
    )?;

    Ok(())
}

fn image(
    key: &EdgeKey,
    state: Option<String>,
    last_updated: Option<i64>,
) -> Result<Option<RelationshipEdge>, StoreError> {
    match (state, last_updated) {
        (Some(state), Some(at)) => Ok(Some(RelationshipEdge::new(
            key.clone(),
            parse_state(&state)?,
            at as u64,
        ))),
        (None, None) => Ok(None),
        _ => Err(StoreError::InvalidData(format!(
            "Incomplete edge image for {}",
            key
        ))),
    }
}

fn change_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChangeEvent> {
    let sequence: i64 = row.get(0)?;
    let kind: String = row.get(1)?;
    let key = EdgeKey::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?);

    let kind = parse_kind(&kind).map_err(|e| conversion_error(1, e))?;
    let before = image(&key, row.get(4)?, row.get(5)?).map_err(|e| conversion_error(4, e))?;
    let after = image(&key, row.get(6)?, row.get(7)?).map_err(|e| conversion_error(6, e))?;

    Ok(ChangeEvent {
        sequence: sequence as u64,
        kind,
        key,
        before,
        after,
    })
}

impl RelationshipStore for SqliteStore {
    type Error = StoreError;

    fn get_edge(&self, key: &EdgeKey) -> Result<Option<RelationshipEdge>, Self::Error> {
        let conn = self.lock()?;
        read_edge(&conn, key)
    }

    fn list_edges(&self, owner: &Identity) -> Result<Vec<RelationshipEdge>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT peer, state, last_updated FROM relationships WHERE owner = ?1 ORDER BY peer",
        )?;

        let edges = stmt
            .query_map(params![owner.as_str()], |row| {
                let peer: String = row.get(0)?;
                let state: String = row.get(1)?;
                let state = parse_state(&state).map_err(|e| conversion_error(1, e))?;
                Ok(RelationshipEdge::new(
                    EdgeKey::new(owner.clone(), peer),
                    state,
                    row.get::<_, i64>(2)? as u64,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(edges)
    }

    fn apply(&self, write: &ConditionalWrite) -> Result<WriteOutcome, Self::Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = read_edge(&tx, &write.key)?;
        let Some(mutation) = write.evaluate(before.as_ref()) else {
            // Dropping the transaction rolls it back
            return Ok(WriteOutcome::PreconditionFailed);
        };

        record(&tx, &write.key, before.as_ref(), &mutation)?;
        tx.commit()?;

        Ok(WriteOutcome::Applied)
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

        let mut conn = self.lock()?;
        let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
            Ok(tx) => tx,
            Err(e) if is_contention(&e) => return Ok(TransactOutcome::Conflict),
            Err(e) => return Err(e.into()),
        };

        let mut staged = Vec::with_capacity(writes.len());
        let mut failed_legs = Vec::new();
        for (leg, write) in writes.iter().enumerate() {
            let before = read_edge(&tx, &write.key)?;
            match write.evaluate(before.as_ref()) {
                Some(mutation) => staged.push((write, before, mutation)),
                None => failed_legs.push(leg),
            }
        }

        if !failed_legs.is_empty() {
            return Ok(TransactOutcome::PreconditionFailed { failed_legs });
        }

        for (write, before, mutation) in &staged {
            record(&tx, &write.key, before.as_ref(), mutation)?;
        }

        match tx.commit() {
            Ok(()) => Ok(TransactOutcome::Committed),
            Err(e) if is_contention(&e) => Ok(TransactOutcome::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    fn read_changes(
        &self,
        after_sequence: u64,
        filter: &EventFilter,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>, Self::Error> {
        let mut sql = String::from(
            "SELECT sequence, event_type, owner, peer, old_state, old_last_updated, new_state, new_last_updated
             FROM change_events WHERE sequence > ? AND event_type = ?",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(after_sequence as i64),
            Box::new(filter.kind.as_str()),
        ];

        if let Some(state) = filter.before_state {
            sql.push_str(" AND old_state = ?");
            params.push(Box::new(state.as_str()));
        }

        if let Some(state) = filter.after_state {
            sql.push_str(" AND new_state = ?");
            params.push(Box::new(state.as_str()));
        }

        sql.push_str(" ORDER BY sequence LIMIT ?");
        params.push(Box::new(limit as i64));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let events = stmt
            .query_map(&param_refs[..], change_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }
}
