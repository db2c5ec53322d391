use super::Propagator;
use crate::guarded::{apply_guarded, before_image};
use crate::{Outcome, ProtocolError};
use rapport_domain::{
    ChangeEvent, ChangeKind, ConditionalWrite, EdgeState, EventFilter, RelationshipStore,
    Timestamp,
};

/// Removes the other half of a friendship
///
/// Deleting the reverse edge emits another `Friends` removal, which comes
/// back here and finds nothing to delete. That second pass is a `NoOp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnfriendPropagator;

impl Propagator for UnfriendPropagator {
    fn name(&self) -> &'static str {
        "unfriend"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::kind(ChangeKind::Remove).before(EdgeState::Friends)
    }

    fn propagate<S: RelationshipStore>(
        &self,
        store: &S,
        event: &ChangeEvent,
        _now: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        let edge = before_image(event)?;
        let write = ConditionalWrite::delete(edge.key.reverse(), EdgeState::Friends);
        apply_guarded(store, &write, "propagate unfriend")
    }
}
