//! Rapport Domain Layer
//!
//! Core vocabulary of the relationship consistency protocol. No I/O lives
//! here; stores and workers depend on these types and traits.
//!
//! ## Key Concepts
//!
//! - **Edge**: one directional relationship record keyed by `(owner, peer)`
//! - **Edge state**: `Requested`, `Pending` or `Friends`; absence is the fourth state
//! - **Change event**: an ordered record of one committed write, with before/after images
//! - **Conditional write**: a guard on the current state plus the write to apply
//!
//! A friendship is two edges, `(A, B)` and `(B, A)`, each written under its
//! own guard. The pair may disagree transiently; propagation of the committed
//! change reconciles it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod edge;
pub mod state;
pub mod traits;
pub mod write;

// Re-exports for convenience
pub use change::{ChangeEvent, ChangeKind, EventFilter};
pub use edge::{now_millis, EdgeKey, Identity, RelationshipEdge, Timestamp};
pub use state::EdgeState;
pub use traits::{DeadLetter, DeliveryLedger, QueuedMessage, RelationshipStore};
pub use write::{
    ConditionalWrite, Effect, Guard, Mutation, TransactOutcome, WriteOutcome,
    MAX_TRANSACTION_ITEMS,
};
