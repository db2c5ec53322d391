//! Per-item outcomes and partial batch responses

use crate::ProtocolError;

/// Result of one action or propagation that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The guarded write was committed
    Applied,

    /// Both peers had requested each other; the collision transaction
    /// moved both edges to `Friends`
    CollisionResolved,

    /// A guard did not hold: the transition was already applied,
    /// superseded, or never applicable
    NoOp,
}

impl Outcome {
    /// Short name used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::CollisionResolved => "collision_resolved",
            Outcome::NoOp => "no_op",
        }
    }
}

/// One item of a batch that must be redelivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemFailure {
    /// Message id or event sequence number
    pub item_id: String,

    /// Why the item failed
    pub error: ProtocolError,
}

/// Per-item verdict for a batch
///
/// Failures never abort sibling items; the caller redelivers exactly the
/// items listed in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    /// Items that completed, with their outcome
    pub outcomes: Vec<(String, Outcome)>,

    /// Items that failed
    pub failures: Vec<BatchItemFailure>,
}

impl BatchResponse {
    /// Create an empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed item
    pub fn record_success(&mut self, item_id: impl Into<String>, outcome: Outcome) {
        self.outcomes.push((item_id.into(), outcome));
    }

    /// Record a failed item
    pub fn record_failure(&mut self, item_id: impl Into<String>, error: ProtocolError) {
        self.failures.push(BatchItemFailure {
            item_id: item_id.into(),
            error,
        });
    }

    /// Whether every item completed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Identifiers of the items to redeliver
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.item_id.as_str()).collect()
    }

    /// Number of completed items with the given outcome
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}
