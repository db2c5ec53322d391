//! Action processor: the first conditional write of every transition

use crate::guarded::apply_guarded;
use crate::{BatchResponse, Outcome, ProtocolError};
use rapport_domain::{
    ConditionalWrite, EdgeKey, EdgeState, Identity, QueuedMessage, RelationshipStore, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action a peer issues against another peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FriendAction {
    /// Ask the target for a relationship
    Request,
    /// Accept a pending request from the target
    Accept,
    /// Decline a pending request from the target
    Reject,
    /// End an established relationship with the target
    Unfriend,
}

impl FriendAction {
    /// All actions
    pub const ALL: [FriendAction; 4] = [
        FriendAction::Request,
        FriendAction::Accept,
        FriendAction::Reject,
        FriendAction::Unfriend,
    ];

    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendAction::Request => "Request",
            FriendAction::Accept => "Accept",
            FriendAction::Reject => "Reject",
            FriendAction::Unfriend => "Unfriend",
        }
    }
}

impl fmt::Display for FriendAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of one message on the action queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    /// Acting peer
    pub player_id: String,

    /// Peer the action targets
    pub friend_id: String,

    /// What the actor wants
    pub friend_action: FriendAction,
}

impl ActionMessage {
    /// Build a message
    pub fn new(actor: impl Into<String>, target: impl Into<String>, action: FriendAction) -> Self {
        Self {
            player_id: actor.into(),
            friend_id: target.into(),
            friend_action: action,
        }
    }

    /// Parse and validate a queue message body
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        let message: ActionMessage = serde_json::from_str(body)?;
        message.validate()?;
        Ok(message)
    }

    /// Serialize to the queue wire format
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject messages with blank identities
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.actor().is_blank() {
            return Err(ProtocolError::MalformedMessage("player_id is empty".into()));
        }
        if self.target().is_blank() {
            return Err(ProtocolError::MalformedMessage("friend_id is empty".into()));
        }
        Ok(())
    }

    /// Acting peer
    pub fn actor(&self) -> Identity {
        Identity::new(self.player_id.as_str())
    }

    /// Targeted peer
    pub fn target(&self) -> Identity {
        Identity::new(self.friend_id.as_str())
    }
}

/// Applies actions from the ingress queue to the actor's own edge
///
/// Stateless: every call is an independent invocation and all coordination
/// goes through the store's guards.
///
/// # Examples
///
/// ```
/// use rapport_domain::{EdgeKey, EdgeState, RelationshipStore};
/// use rapport_protocol::{ActionProcessor, FriendAction, Outcome};
/// use rapport_store::MemoryStore;
///
/// let store = MemoryStore::new();
/// let outcome = ActionProcessor
///     .process(&store, FriendAction::Request, &"p1".into(), &"p2".into(), 1)
///     .unwrap();
/// assert_eq!(outcome, Outcome::Applied);
///
/// let edge = store.get_edge(&EdgeKey::new("p1", "p2")).unwrap().unwrap();
/// assert_eq!(edge.state, EdgeState::Requested);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionProcessor;

impl ActionProcessor {
    /// Apply one action as a guarded write on edge `(actor, target)`
    ///
    /// A guard that does not hold (including a self-request) is
    /// [`Outcome::NoOp`]. Only transport failures are errors.
    pub fn process<S: RelationshipStore>(
        &self,
        store: &S,
        action: FriendAction,
        actor: &Identity,
        target: &Identity,
        at: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        let key = EdgeKey::new(actor.clone(), target.clone());

        let write = match action {
            FriendAction::Request => {
                if key.is_reflexive() {
                    tracing::debug!("ignoring self request from {}", actor);
                    return Ok(Outcome::NoOp);
                }
                ConditionalWrite::create(key, EdgeState::Requested, at)
            }
            FriendAction::Accept => {
                ConditionalWrite::transition(key, EdgeState::Pending, EdgeState::Friends, at)
            }
            FriendAction::Reject => ConditionalWrite::delete(key, EdgeState::Pending),
            FriendAction::Unfriend => ConditionalWrite::delete(key, EdgeState::Friends),
        };

        apply_guarded(store, &write, &action.as_str().to_lowercase())
    }

    /// Apply a parsed queue message
    pub fn process_message<S: RelationshipStore>(
        &self,
        store: &S,
        message: &ActionMessage,
        at: Timestamp,
    ) -> Result<Outcome, ProtocolError> {
        message.validate()?;
        self.process(
            store,
            message.friend_action,
            &message.actor(),
            &message.target(),
            at,
        )
    }

    /// Process a batch of queue messages independently
    ///
    /// Each message is parsed and applied on its own; a failure is recorded
    /// against that message id and never affects its siblings.
    pub fn process_batch<S: RelationshipStore>(
        &self,
        store: &S,
        messages: &[QueuedMessage],
        at: Timestamp,
    ) -> BatchResponse {
        let mut response = BatchResponse::new();

        for message in messages {
            let result = ActionMessage::parse(&message.body)
                .and_then(|action| self.process_message(store, &action, at));

            match result {
                Ok(outcome) => response.record_success(message.message_id.as_str(), outcome),
                Err(e) => {
                    tracing::warn!("action message {} failed: {}", message.message_id, e);
                    response.record_failure(message.message_id.as_str(), e);
                }
            }
        }

        response
    }
}
