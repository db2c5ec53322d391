use super::Propagator;
use crate::guarded::after_image;
use crate::{Outcome, ProtocolError};
use rapport_domain::{
    ChangeEvent, ChangeKind, ConditionalWrite, EdgeState, EventFilter, RelationshipStore,
    TransactOutcome, Timestamp, WriteOutcome,
};

/// Mirrors a new request onto the target as `Pending`
///
/// When the target already holds an edge back to the actor, both peers
/// have requested each other. The two `Requested` edges are then flipped
/// to `Friends` in one transaction, each leg guarded on `Requested`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestPropagator;

impl Propagator for RequestPropagator {
    fn name(&self) -> &'static str {
        "request"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::kind(ChangeKind::Insert).after(EdgeState::Requested)
    }

    fn propagate<S: RelationshipStore>(
        &self,
        store: &S,
        event: &ChangeEvent,
        now: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        let edge = after_image(event)?;
        let reverse = edge.key.reverse();

        let mirror = ConditionalWrite::create(reverse.clone(), EdgeState::Pending, now);
        match store.apply(&mirror).map_err(ProtocolError::store)? {
            WriteOutcome::Applied => {
                tracing::info!("propagate request applied to {}", reverse);
                return Ok(Outcome::Applied);
            }
            WriteOutcome::PreconditionFailed => {
                tracing::debug!("{} already exists, resolving collision", reverse);
            }
        }

        let legs = [
            ConditionalWrite::transition(
                edge.key.clone(),
                EdgeState::Requested,
                EdgeState::Friends,
                now,
            ),
            ConditionalWrite::transition(
                reverse.clone(),
                EdgeState::Requested,
                EdgeState::Friends,
                now,
            ),
        ];

        match store.transact(&legs).map_err(ProtocolError::store)? {
            TransactOutcome::Committed => {
                tracing::info!("collision resolved, {} and {} are friends", edge.key, reverse);
                Ok(Outcome::CollisionResolved)
            }
            TransactOutcome::PreconditionFailed { failed_legs } => {
                tracing::debug!(
                    "could not resolve collision on {}, legs {:?} already advanced",
                    edge.key,
                    failed_legs
                );
                Ok(Outcome::NoOp)
            }
            TransactOutcome::Conflict => Err(ProtocolError::TransactionConflict {
                owner: edge.key.owner.clone(),
                peer: edge.key.peer.clone(),
            }),
        }
    }
}
