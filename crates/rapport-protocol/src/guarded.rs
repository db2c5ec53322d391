//! Store-contract helpers shared by the processor and the propagators

use crate::{Outcome, ProtocolError};
use rapport_domain::{ChangeEvent, ConditionalWrite, RelationshipEdge, RelationshipStore, WriteOutcome};

/// Apply one guarded write, folding a failed guard into [`Outcome::NoOp`]
///
/// `step` names the transition for the log ("accept", "propagate reject", ...).
pub(crate) fn apply_guarded<S: RelationshipStore>(
    store: &S,
    write: &ConditionalWrite,
    step: &str,
) -> Result<Outcome, ProtocolError> {
    match store.apply(write).map_err(ProtocolError::store)? {
        WriteOutcome::Applied => {
            tracing::info!("{} applied to {}", step, write.key);
            Ok(Outcome::Applied)
        }
        WriteOutcome::PreconditionFailed => {
            tracing::debug!(
                "could not {} {}, guard {:?} not met",
                step,
                write.key,
                write.guard
            );
            Ok(Outcome::NoOp)
        }
    }
}

/// Edge image after the write that produced the event
pub(crate) fn after_image(event: &ChangeEvent) -> Result<&RelationshipEdge, ProtocolError> {
    event.after.as_ref().ok_or(ProtocolError::MissingImage {
        sequence: event.sequence,
        image: "after",
    })
}

/// Edge image before the write that produced the event
pub(crate) fn before_image(event: &ChangeEvent) -> Result<&RelationshipEdge, ProtocolError> {
    event.before.as_ref().ok_or(ProtocolError::MissingImage {
        sequence: event.sequence,
        image: "before",
    })
}
