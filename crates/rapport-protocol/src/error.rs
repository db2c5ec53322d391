//! Error types for protocol operations
//!
//! A guard that does not hold is never an error; it surfaces as
//! [`crate::Outcome::NoOp`]. Everything here is a per-item failure.

use rapport_domain::Identity;
use thiserror::Error;

/// Errors that fail a single action message or change event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Store transport failure (timeout, unavailability)
    #[error("Store error: {0}")]
    Store(String),

    /// The collision transaction was aborted by contention on its keys
    #[error("Transaction conflict between {owner} and {peer}")]
    TransactionConflict {
        /// Owner of the edge whose event triggered the transaction
        owner: Identity,
        /// Peer of that edge
        peer: Identity,
    },

    /// Action message could not be parsed or is missing a field
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Change event lacks the edge image the propagator needs
    #[error("Change event {sequence} has no {image} image")]
    MissingImage {
        /// Sequence number of the event
        sequence: u64,
        /// Which image was missing ("before" or "after")
        image: &'static str,
    },
}

impl ProtocolError {
    /// Wrap a store transport error
    pub fn store<E: std::fmt::Display>(e: E) -> Self {
        ProtocolError::Store(e.to_string())
    }

    /// Whether redelivering the same item could succeed
    ///
    /// Malformed input fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProtocolError::Store(_) | ProtocolError::TransactionConflict { .. } => true,
            ProtocolError::MalformedMessage(_) | ProtocolError::MissingImage { .. } => false,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::MalformedMessage(e.to_string())
    }
}
