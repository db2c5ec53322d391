//! Change propagators: the mirrored second write of every transition
//!
//! Each propagator subscribes to a disjoint slice of the change stream
//! (see [`Propagator::filter`]) and applies a guarded write to the reverse
//! edge of the one that changed. Guards make every propagator safe under
//! redelivery and reordering across keys.

mod accept;
mod reject;
mod request;
mod unfriend;

pub use accept::AcceptPropagator;
pub use reject::RejectPropagator;
pub use request::RequestPropagator;
pub use unfriend::UnfriendPropagator;

use crate::{BatchResponse, Outcome, ProtocolError};
use rapport_domain::{ChangeEvent, EventFilter, RelationshipStore, Timestamp};
use std::fmt;

/// Reacts to one kind of committed change
pub trait Propagator {
    /// Consumer name, used for checkpoints and dead letters
    fn name(&self) -> &'static str;

    /// The slice of the change stream this propagator handles
    fn filter(&self) -> EventFilter;

    /// Apply the mirrored write for one event
    fn propagate<S: RelationshipStore>(
        &self,
        store: &S,
        event: &ChangeEvent,
        now: Timestamp,
    ) -> Result<Outcome, ProtocolError>;

    /// Propagate an event, ignoring events outside the filter
    fn handle<S: RelationshipStore>(
        &self,
        store: &S,
        event: &ChangeEvent,
        now: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        if !self.filter().matches(event) {
            tracing::debug!("{} ignoring event {}", self.name(), event.sequence);
            return Ok(Outcome::NoOp);
        }
        self.propagate(store, event, now)
    }

    /// Propagate a batch of events independently
    ///
    /// Items are identified by event sequence number.
    fn handle_batch<S: RelationshipStore>(
        &self,
        store: &S,
        events: &[ChangeEvent],
        now: Timestamp,
    ) -> BatchResponse {
        let mut response = BatchResponse::new();
        for event in events {
            match self.handle(store, event, now) {
                Ok(outcome) => response.record_success(event.sequence.to_string(), outcome),
                Err(e) => {
                    tracing::warn!("{} failed on event {}: {}", self.name(), event.sequence, e);
                    response.record_failure(event.sequence.to_string(), e);
                }
            }
        }
        response
    }
}

/// The four propagation paths, as a value
///
/// Workers are keyed by a `Transition` so one generic worker can run any
/// of the propagators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// New `Requested` edge
    Request,
    /// `Pending` edge became `Friends`
    Accept,
    /// `Pending` edge removed
    Reject,
    /// `Friends` edge removed
    Unfriend,
}

impl Transition {
    /// All transitions
    pub const ALL: [Transition; 4] = [
        Transition::Request,
        Transition::Accept,
        Transition::Reject,
        Transition::Unfriend,
    ];

    /// Find the transition whose filter matches the event
    ///
    /// Filters are disjoint, so at most one matches.
    pub fn route(event: &ChangeEvent) -> Option<Transition> {
        Self::ALL.into_iter().find(|t| t.filter().matches(event))
    }
}

impl Propagator for Transition {
    fn name(&self) -> &'static str {
        match self {
            Transition::Request => RequestPropagator.name(),
            Transition::Accept => AcceptPropagator.name(),
            Transition::Reject => RejectPropagator.name(),
            Transition::Unfriend => UnfriendPropagator.name(),
        }
    }

    fn filter(&self) -> EventFilter {
        match self {
            Transition::Request => RequestPropagator.filter(),
            Transition::Accept => AcceptPropagator.filter(),
            Transition::Reject => RejectPropagator.filter(),
            Transition::Unfriend => UnfriendPropagator.filter(),
        }
    }

    fn propagate<S: RelationshipStore>(
        &self,
        store: &S,
        event: &ChangeEvent,
        now: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        match self {
            Transition::Request => RequestPropagator.propagate(store, event, now),
            Transition::Accept => AcceptPropagator.propagate(store, event, now),
            Transition::Reject => RejectPropagator.propagate(store, event, now),
            Transition::Unfriend => UnfriendPropagator.propagate(store, event, now),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
