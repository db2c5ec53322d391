use super::Propagator;
use crate::guarded::{after_image, apply_guarded};
use crate::{Outcome, ProtocolError};
use rapport_domain::{
    ChangeEvent, ChangeKind, ConditionalWrite, EdgeState, EventFilter, RelationshipStore,
    Timestamp,
};

/// Mirrors an accepted request back onto the requester
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptPropagator;

impl Propagator for AcceptPropagator {
    fn name(&self) -> &'static str {
        "accept"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::kind(ChangeKind::Modify)
            .before(EdgeState::Pending)
            .after(EdgeState::Friends)
    }

    fn propagate<S: RelationshipStore>(
        &self,
        store: &S,
        event: &ChangeEvent,
        now: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        let edge = after_image(event)?;
        let write = ConditionalWrite::transition(
            edge.key.reverse(),
            EdgeState::Requested,
            EdgeState::Friends,
            now,
        );
        apply_guarded(store, &write, "propagate accept")
    }
}
