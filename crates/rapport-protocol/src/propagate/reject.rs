use super::Propagator;
use crate::guarded::{apply_guarded, before_image};
use crate::{Outcome, ProtocolError};
use rapport_domain::{
    ChangeEvent, ChangeKind, ConditionalWrite, EdgeState, EventFilter, RelationshipStore,
    Timestamp,
};

/// Withdraws the requester's edge once the request is rejected
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectPropagator;

impl Propagator for RejectPropagator {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::kind(ChangeKind::Remove).before(EdgeState::Pending)
    }

    fn propagate<S: RelationshipStore>(
        &self,
        store: &S,
        event: &ChangeEvent,
        _now: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        let edge = before_image(event)?;
        let write = ConditionalWrite::delete(edge.key.reverse(), EdgeState::Requested);
        apply_guarded(store, &write, "propagate reject")
    }
}
