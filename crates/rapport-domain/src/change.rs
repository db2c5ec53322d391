//! Change events - the ordered record of every committed edge write

use crate::{EdgeKey, EdgeState, RelationshipEdge};
use std::fmt;

/// Kind of committed write that produced a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// An edge was created
    Insert,

    /// An existing edge changed state
    Modify,

    /// An edge was deleted
    Remove,
}

impl ChangeKind {
    /// Get the kind name as stored in the change log
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Modify => "MODIFY",
            ChangeKind::Remove => "REMOVE",
        }
    }

    /// Parse a kind from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(ChangeKind::Insert),
            "MODIFY" => Some(ChangeKind::Modify),
            "REMOVE" => Some(ChangeKind::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed write, with images of the edge before and after it
///
/// `before` is `None` for inserts, `after` is `None` for removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Store-assigned position in the change stream (strictly increasing)
    pub sequence: u64,

    /// Kind of write
    pub kind: ChangeKind,

    /// Key of the written edge
    pub key: EdgeKey,

    /// Edge image before the write
    pub before: Option<RelationshipEdge>,

    /// Edge image after the write
    pub after: Option<RelationshipEdge>,
}

impl ChangeEvent {
    /// State recorded in the before-image, if any
    pub fn before_state(&self) -> Option<EdgeState> {
        self.before.as_ref().map(|e| e.state)
    }

    /// State recorded in the after-image, if any
    pub fn after_state(&self) -> Option<EdgeState> {
        self.after.as_ref().map(|e| e.state)
    }
}

/// Server-side filter over the change stream
///
/// Each propagator subscribes with one filter so it only receives the
/// events relevant to its transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    /// Required event kind
    pub kind: ChangeKind,

    /// Required state in the before-image (if constrained)
    pub before_state: Option<EdgeState>,

    /// Required state in the after-image (if constrained)
    pub after_state: Option<EdgeState>,
}

impl EventFilter {
    /// Filter on kind only
    pub fn kind(kind: ChangeKind) -> Self {
        Self {
            kind,
            before_state: None,
            after_state: None,
        }
    }

    /// Additionally require a before-image state
    pub fn before(mut self, state: EdgeState) -> Self {
        self.before_state = Some(state);
        self
    }

    /// Additionally require an after-image state
    pub fn after(mut self, state: EdgeState) -> Self {
        self.after_state = Some(state);
        self
    }

    /// Whether the event passes this filter
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.kind != self.kind {
            return false;
        }
        if let Some(state) = self.before_state {
            if event.before_state() != Some(state) {
                return false;
            }
        }
        if let Some(state) = self.after_state {
            if event.after_state() != Some(state) {
                return false;
            }
        }
        true
    }
}
