//! Integration tests for rapport-store
//!
//! These tests verify guarded writes, the collision transaction and the
//! change stream against a real SQLite database.

use rapport_domain::traits::{DeliveryLedger, RelationshipStore};
use rapport_domain::{
    ChangeKind, ConditionalWrite, DeadLetter, EdgeKey, EdgeState, EventFilter, Identity,
    TransactOutcome, WriteOutcome,
};
use rapport_store::{SqliteStore, StoreError};
use std::time::Duration;

fn requested(owner: &str, peer: &str, at: u64) -> ConditionalWrite {
    ConditionalWrite::create(EdgeKey::new(owner, peer), EdgeState::Requested, at)
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_create_and_get_edge() {
    let store = SqliteStore::new(":memory:").unwrap();

    let outcome = store.apply(&requested("p1", "p2", 1000)).unwrap();
    assert_eq!(outcome, WriteOutcome::Applied);

    let edge = store.get_edge(&EdgeKey::new("p1", "p2")).unwrap().unwrap();
    assert_eq!(edge.state, EdgeState::Requested);
    assert_eq!(edge.last_updated, 1000);

    // No edge recorded in the other direction
    assert!(store.get_edge(&EdgeKey::new("p2", "p1")).unwrap().is_none());
}

#[test]
fn test_create_guard_rejects_existing_edge() {
    let store = SqliteStore::new(":memory:").unwrap();

    assert_eq!(store.apply(&requested("p1", "p2", 1)).unwrap(), WriteOutcome::Applied);
    assert_eq!(
        store.apply(&requested("p1", "p2", 2)).unwrap(),
        WriteOutcome::PreconditionFailed
    );

    let edge = store.get_edge(&EdgeKey::new("p1", "p2")).unwrap().unwrap();
    assert_eq!(edge.last_updated, 1, "Failed guard must not touch the edge");
}

#[test]
fn test_self_edge_never_created() {
    let store = SqliteStore::new(":memory:").unwrap();

    assert_eq!(
        store.apply(&requested("p1", "p1", 1)).unwrap(),
        WriteOutcome::PreconditionFailed
    );
    assert!(store.list_edges(&Identity::new("p1")).unwrap().is_empty());
}

#[test]
fn test_transition_and_delete_guards() {
    let store = SqliteStore::new(":memory:").unwrap();
    let key = EdgeKey::new("p2", "p1");
    store
        .apply(&ConditionalWrite::create(key.clone(), EdgeState::Pending, 1))
        .unwrap();

    // Wrong expected state
    let unfriend = ConditionalWrite::delete(key.clone(), EdgeState::Friends);
    assert_eq!(store.apply(&unfriend).unwrap(), WriteOutcome::PreconditionFailed);

    let accept =
        ConditionalWrite::transition(key.clone(), EdgeState::Pending, EdgeState::Friends, 2);
    assert_eq!(store.apply(&accept).unwrap(), WriteOutcome::Applied);
    assert_eq!(store.apply(&accept).unwrap(), WriteOutcome::PreconditionFailed);

    assert_eq!(store.apply(&unfriend).unwrap(), WriteOutcome::Applied);
    assert_eq!(store.apply(&unfriend).unwrap(), WriteOutcome::PreconditionFailed);
    assert!(store.get_edge(&key).unwrap().is_none());
}

#[test]
fn test_list_edges_by_owner() {
    let store = SqliteStore::new(":memory:").unwrap();
    store.apply(&requested("p1", "p3", 1)).unwrap();
    store.apply(&requested("p1", "p2", 1)).unwrap();
    store.apply(&requested("p2", "p1", 1)).unwrap();

    let edges = store.list_edges(&Identity::new("p1")).unwrap();
    let peers: Vec<&str> = edges.iter().map(|e| e.peer().as_str()).collect();
    assert_eq!(peers, vec!["p2", "p3"]);
}

#[test]
fn test_collision_transaction_commits_both_legs() {
    let store = SqliteStore::new(":memory:").unwrap();
    store.apply(&requested("p1", "p2", 1)).unwrap();
    store.apply(&requested("p2", "p1", 1)).unwrap();

    let legs = [
        ConditionalWrite::transition(
            EdgeKey::new("p2", "p1"),
            EdgeState::Requested,
            EdgeState::Friends,
            5,
        ),
        ConditionalWrite::transition(
            EdgeKey::new("p1", "p2"),
            EdgeState::Requested,
            EdgeState::Friends,
            5,
        ),
    ];

    assert_eq!(store.transact(&legs).unwrap(), TransactOutcome::Committed);
    for key in [EdgeKey::new("p1", "p2"), EdgeKey::new("p2", "p1")] {
        assert_eq!(store.get_edge(&key).unwrap().unwrap().state, EdgeState::Friends);
    }

    // Replay: both guards now fail, nothing written
    assert_eq!(
        store.transact(&legs).unwrap(),
        TransactOutcome::PreconditionFailed {
            failed_legs: vec![0, 1]
        }
    );
}

#[test]
fn test_transaction_is_all_or_nothing() {
    let store = SqliteStore::new(":memory:").unwrap();
    store.apply(&requested("p1", "p2", 1)).unwrap();
    store
        .apply(&ConditionalWrite::create(EdgeKey::new("p2", "p1"), EdgeState::Pending, 1))
        .unwrap();
    let before = store.latest_sequence().unwrap();

    let legs = [
        ConditionalWrite::transition(
            EdgeKey::new("p1", "p2"),
            EdgeState::Requested,
            EdgeState::Friends,
            5,
        ),
        ConditionalWrite::transition(
            EdgeKey::new("p2", "p1"),
            EdgeState::Requested,
            EdgeState::Friends,
            5,
        ),
    ];

    assert_eq!(
        store.transact(&legs).unwrap(),
        TransactOutcome::PreconditionFailed {
            failed_legs: vec![1]
        }
    );
    assert_eq!(
        store.get_edge(&EdgeKey::new("p1", "p2")).unwrap().unwrap().state,
        EdgeState::Requested
    );
    assert_eq!(store.latest_sequence().unwrap(), before, "No change events on abort");
}

#[test]
fn test_transaction_limits() {
    let store = SqliteStore::new(":memory:").unwrap();

    let too_many: Vec<_> = (0..26).map(|i| requested("p1", &format!("p{}", i + 2), 1)).collect();
    assert!(matches!(
        store.transact(&too_many),
        Err(StoreError::TooManyItems { items: 26, .. })
    ));

    let duplicated = [requested("p1", "p2", 1), requested("p1", "p2", 2)];
    assert!(matches!(store.transact(&duplicated), Err(StoreError::InvalidData(_))));
}

#[test]
fn test_change_stream_images() {
    let store = SqliteStore::new(":memory:").unwrap();
    let key = EdgeKey::new("p2", "p1");
    store
        .apply(&ConditionalWrite::create(key.clone(), EdgeState::Pending, 1))
        .unwrap();
    store
        .apply(&ConditionalWrite::transition(
            key.clone(),
            EdgeState::Pending,
            EdgeState::Friends,
            2,
        ))
        .unwrap();
    store
        .apply(&ConditionalWrite::delete(key.clone(), EdgeState::Friends))
        .unwrap();

    let inserts = store
        .read_changes(0, &EventFilter::kind(ChangeKind::Insert), 10)
        .unwrap();
    assert_eq!(inserts.len(), 1);
    assert!(inserts[0].before.is_none());
    assert_eq!(inserts[0].after_state(), Some(EdgeState::Pending));

    let modifies = store
        .read_changes(0, &EventFilter::kind(ChangeKind::Modify), 10)
        .unwrap();
    assert_eq!(modifies.len(), 1);
    assert_eq!(modifies[0].before_state(), Some(EdgeState::Pending));
    assert_eq!(modifies[0].after.as_ref().map(|e| e.last_updated), Some(2));

    let removes = store
        .read_changes(0, &EventFilter::kind(ChangeKind::Remove), 10)
        .unwrap();
    assert_eq!(removes.len(), 1);
    assert_eq!(removes[0].before_state(), Some(EdgeState::Friends));
    assert!(removes[0].after.is_none());
    assert_eq!(removes[0].key, key);

    assert!(inserts[0].sequence < modifies[0].sequence);
    assert!(modifies[0].sequence < removes[0].sequence);
}

#[test]
fn test_change_stream_filters_and_paging() {
    let store = SqliteStore::new(":memory:").unwrap();
    store.apply(&requested("p1", "p2", 1)).unwrap();
    store
        .apply(&ConditionalWrite::create(EdgeKey::new("p2", "p1"), EdgeState::Pending, 1))
        .unwrap();
    store.apply(&requested("p1", "p3", 1)).unwrap();
    store.apply(&requested("p1", "p4", 1)).unwrap();

    let filter = EventFilter::kind(ChangeKind::Insert).after(EdgeState::Requested);

    let first = store.read_changes(0, &filter, 2).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].key, EdgeKey::new("p1", "p2"));
    assert_eq!(first[1].key, EdgeKey::new("p1", "p3"));

    let rest = store.read_changes(first[1].sequence, &filter, 2).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].key, EdgeKey::new("p1", "p4"));

    let pending_removals = EventFilter::kind(ChangeKind::Remove).before(EdgeState::Pending);
    assert!(store.read_changes(0, &pending_removals, 10).unwrap().is_empty());
}

#[test]
fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rapport.db");

    {
        let store = SqliteStore::new(&path).unwrap();
        store.apply(&requested("p1", "p2", 7)).unwrap();
        store.commit_checkpoint("request", 1).unwrap();
    }

    let store = SqliteStore::new(&path).unwrap();
    assert_eq!(
        store.get_edge(&EdgeKey::new("p1", "p2")).unwrap().unwrap().last_updated,
        7
    );
    assert_eq!(store.checkpoint("request").unwrap(), 1);
    assert_eq!(store.latest_sequence().unwrap(), 1);
}

#[test]
fn test_two_connections_share_guards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rapport.db");

    let first = SqliteStore::with_busy_timeout(&path, Duration::from_millis(500)).unwrap();
    let second = SqliteStore::with_busy_timeout(&path, Duration::from_millis(500)).unwrap();

    assert_eq!(first.apply(&requested("p1", "p2", 1)).unwrap(), WriteOutcome::Applied);
    assert_eq!(
        second.apply(&requested("p1", "p2", 2)).unwrap(),
        WriteOutcome::PreconditionFailed
    );
}

#[test]
fn test_locked_database_is_a_transaction_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rapport.db");
    let store = SqliteStore::with_busy_timeout(&path, Duration::from_millis(50)).unwrap();

    store.apply(&requested("p1", "p2", 1)).unwrap();
    store.apply(&requested("p2", "p1", 2)).unwrap();
    let befriend = |owner: &str, peer: &str| {
        ConditionalWrite::transition(
            EdgeKey::new(owner, peer),
            EdgeState::Requested,
            EdgeState::Friends,
            3,
        )
    };
    let collision = [befriend("p1", "p2"), befriend("p2", "p1")];

    // Another process holds the write lock
    let holder = rusqlite::Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE").unwrap();

    assert_eq!(store.transact(&collision).unwrap(), TransactOutcome::Conflict);
    assert!(matches!(
        store.apply(&requested("p3", "p4", 4)),
        Err(StoreError::Database(_))
    ));
    assert_eq!(
        store.get_edge(&EdgeKey::new("p1", "p2")).unwrap().map(|e| e.state),
        Some(EdgeState::Requested)
    );

    holder.execute_batch("COMMIT").unwrap();
    assert_eq!(store.transact(&collision).unwrap(), TransactOutcome::Committed);
}

#[test]
fn test_dead_letters_newest_first() {
    let store = SqliteStore::new(":memory:").unwrap();

    for (i, reason) in ["timeout", "conflict"].iter().enumerate() {
        store
            .dead_letter(&DeadLetter {
                source: "request".to_string(),
                item_id: format!("{}", i + 1),
                payload: "INSERT (p1, p2)".to_string(),
                reason: reason.to_string(),
                attempts: 2,
                created_at: 100 + i as u64,
            })
            .unwrap();
    }

    let letters = store.dead_letters(10).unwrap();
    assert_eq!(letters.len(), 2);
    assert_eq!(letters[0].reason, "conflict");
    assert_eq!(letters[1].item_id, "1");
    assert_eq!(store.dead_letters(1).unwrap().len(), 1);
}

#[test]
fn test_queue_acknowledge_removes_message() {
    let store = SqliteStore::new(":memory:").unwrap();
    let first = store.enqueue(r#"{"n":1}"#).unwrap();
    let second = store.enqueue(r#"{"n":2}"#).unwrap();
    assert_ne!(first, second);

    let batch = store.receive(1, Duration::from_secs(30)).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].message_id, first, "Queue delivers in enqueue order");

    store.acknowledge(&first).unwrap();
    store.release(&first).unwrap();

    let batch = store.receive(10, Duration::from_secs(30)).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].message_id, second);
}
