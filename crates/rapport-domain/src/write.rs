//! Conditional-write vocabulary shared by every store implementation
//!
//! Every transition is a compare-and-swap: a [`Guard`] on the current state
//! of one edge plus the [`Effect`] to apply when the guard holds. Stores
//! report the guard's verdict as a typed outcome instead of an error code.

use crate::{ChangeKind, EdgeKey, EdgeState, RelationshipEdge, Timestamp};

/// Largest number of legs a single transaction may carry
pub const MAX_TRANSACTION_ITEMS: usize = 25;

/// Precondition on the current state of one edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// No edge exists at the key
    Absent,

    /// An edge exists and holds exactly this state
    StateIs(EdgeState),
}

impl Guard {
    /// Whether the guard holds for the edge's current state (`None` = absent)
    pub fn holds(&self, current: Option<EdgeState>) -> bool {
        match self {
            Guard::Absent => current.is_none(),
            Guard::StateIs(expected) => current == Some(*expected),
        }
    }
}

/// What to do to the edge when the guard holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Write a new edge with the given state
    Create {
        /// State of the new edge
        state: EdgeState,
        /// Timestamp recorded on the edge
        at: Timestamp,
    },

    /// Change the state of the existing edge
    SetState {
        /// New state
        state: EdgeState,
        /// Timestamp recorded on the edge
        at: Timestamp,
    },

    /// Remove the edge
    Delete,
}

/// A guarded single-edge write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalWrite {
    /// Edge being written
    pub key: EdgeKey,

    /// Precondition on the edge's current state
    pub guard: Guard,

    /// Write applied when the guard holds
    pub effect: Effect,
}

/// The committed result of evaluating a [`ConditionalWrite`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Kind of change event the write produces
    pub kind: ChangeKind,

    /// Edge image after the write (`None` for deletes)
    pub after: Option<RelationshipEdge>,
}

impl ConditionalWrite {
    /// Create `key` in `state`, only if no edge exists there
    pub fn create(key: EdgeKey, state: EdgeState, at: Timestamp) -> Self {
        Self {
            key,
            guard: Guard::Absent,
            effect: Effect::Create { state, at },
        }
    }

    /// Move `key` from `from` to `to`
    pub fn transition(key: EdgeKey, from: EdgeState, to: EdgeState, at: Timestamp) -> Self {
        Self {
            key,
            guard: Guard::StateIs(from),
            effect: Effect::SetState { state: to, at },
        }
    }

    /// Delete `key`, only if it currently holds `state`
    pub fn delete(key: EdgeKey, state: EdgeState) -> Self {
        Self {
            key,
            guard: Guard::StateIs(state),
            effect: Effect::Delete,
        }
    }

    /// Evaluate the write against the edge's current image
    ///
    /// Returns `None` when the precondition fails. Creating a reflexive edge
    /// always fails, as does updating or deleting an absent edge.
    pub fn evaluate(&self, current: Option<&RelationshipEdge>) -> Option<Mutation> {
        if !self.guard.holds(current.map(|e| e.state)) {
            return None;
        }

        match (self.effect, current) {
            (Effect::Create { .. }, _) if self.key.is_reflexive() => None,
            (Effect::Create { state, at }, existing) => Some(Mutation {
                kind: if existing.is_some() {
                    ChangeKind::Modify
                } else {
                    ChangeKind::Insert
                },
                after: Some(RelationshipEdge::new(self.key.clone(), state, at)),
            }),
            (Effect::SetState { state, at }, Some(_)) => Some(Mutation {
                kind: ChangeKind::Modify,
                after: Some(RelationshipEdge::new(self.key.clone(), state, at)),
            }),
            (Effect::Delete, Some(_)) => Some(Mutation {
                kind: ChangeKind::Remove,
                after: None,
            }),
            (Effect::SetState { .. }, None) | (Effect::Delete, None) => None,
        }
    }
}

/// Result of a single conditional write that reached the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Guard held; the write is committed
    Applied,

    /// Guard did not hold; nothing was written
    PreconditionFailed,
}

/// Result of a multi-edge transaction that reached the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactOutcome {
    /// Every leg's guard held; all legs are committed
    Committed,

    /// At least one guard did not hold; nothing was written
    PreconditionFailed {
        /// Indices of the legs whose guards failed
        failed_legs: Vec<usize>,
    },

    /// Aborted by contention on the same keys; nothing was written.
    /// Retrying may succeed.
    Conflict,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(owner: &str, peer: &str, state: EdgeState) -> RelationshipEdge {
        RelationshipEdge::new(EdgeKey::new(owner, peer), state, 10)
    }

    #[test]
    fn test_create_requires_absence() {
        let write = ConditionalWrite::create(EdgeKey::new("p1", "p2"), EdgeState::Requested, 20);

        let mutation = write.evaluate(None).unwrap();
        assert_eq!(mutation.kind, ChangeKind::Insert);
        assert_eq!(mutation.after.unwrap().state, EdgeState::Requested);

        assert!(write.evaluate(Some(&edge("p1", "p2", EdgeState::Pending))).is_none());
    }

    #[test]
    fn test_create_reflexive_never_applies() {
        let write = ConditionalWrite::create(EdgeKey::new("p1", "p1"), EdgeState::Requested, 20);
        assert!(write.evaluate(None).is_none());
    }

    #[test]
    fn test_transition_guard() {
        let key = EdgeKey::new("p2", "p1");
        let write = ConditionalWrite::transition(key, EdgeState::Pending, EdgeState::Friends, 30);

        let mutation = write.evaluate(Some(&edge("p2", "p1", EdgeState::Pending))).unwrap();
        assert_eq!(mutation.kind, ChangeKind::Modify);
        assert_eq!(mutation.after.as_ref().map(|e| e.last_updated), Some(30));

        assert!(write.evaluate(Some(&edge("p2", "p1", EdgeState::Friends))).is_none());
        assert!(write.evaluate(None).is_none());
    }

    #[test]
    fn test_delete_guard() {
        let write = ConditionalWrite::delete(EdgeKey::new("p1", "p2"), EdgeState::Friends);

        let mutation = write.evaluate(Some(&edge("p1", "p2", EdgeState::Friends))).unwrap();
        assert_eq!(mutation.kind, ChangeKind::Remove);
        assert!(mutation.after.is_none());

        // Second unfriend propagation finds nothing to delete
        assert!(write.evaluate(None).is_none());
    }

    #[test]
    fn test_guard_holds() {
        assert!(Guard::Absent.holds(None));
        assert!(!Guard::Absent.holds(Some(EdgeState::Pending)));
        assert!(Guard::StateIs(EdgeState::Pending).holds(Some(EdgeState::Pending)));
        assert!(!Guard::StateIs(EdgeState::Pending).holds(None));
    }
}
