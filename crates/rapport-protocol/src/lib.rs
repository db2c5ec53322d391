//! Rapport Protocol - Relationship consistency rules
//!
//! Every transition between two peers is split into two guarded writes:
//!
//! - The [`ActionProcessor`] applies the first write to the actor's own edge
//!   `(actor, target)` when an action arrives from the ingress queue.
//! - A [`Propagator`] reacts to the committed change and applies the mirrored
//!   write to the reverse edge `(target, actor)`.
//!
//! A guard that no longer holds means the transition was already applied or
//! superseded; it is reported as [`Outcome::NoOp`], never as an error. Only
//! transport failures, transaction conflicts and malformed input fail an item,
//! and they fail only that item of its batch.
//!
//! # Example
//!
//! ```
//! use rapport_domain::{EdgeKey, EdgeState, RelationshipStore};
//! use rapport_protocol::{ActionProcessor, FriendAction, Propagator, Transition};
//! use rapport_store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! ActionProcessor
//!     .process(&store, FriendAction::Request, &"p1".into(), &"p2".into(), 1)
//!     .unwrap();
//!
//! for event in store.change_log().unwrap() {
//!     if let Some(transition) = Transition::route(&event) {
//!         transition.propagate(&store, &event, 2).unwrap();
//!     }
//! }
//!
//! let reverse = store.get_edge(&EdgeKey::new("p2", "p1")).unwrap().unwrap();
//! assert_eq!(reverse.state, EdgeState::Pending);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod action;
mod error;
mod guarded;
mod outcome;
pub mod propagate;

pub use action::{ActionMessage, ActionProcessor, FriendAction};
pub use error::ProtocolError;
pub use outcome::{BatchItemFailure, BatchResponse, Outcome};
pub use propagate::{
    AcceptPropagator, Propagator, RejectPropagator, RequestPropagator, Transition,
    UnfriendPropagator,
};
