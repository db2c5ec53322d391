//! Edge module - one directional relationship record
//!
//! A friendship between A and B is two edges, `(A, B)` and `(B, A)`.
//! Each is guarded and written independently; the propagators reconcile them.

use crate::EdgeState;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

/// Opaque peer identity (e.g. a player id)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(String);

impl Identity {
    /// Wrap a raw identity string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity is empty or only whitespace
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Primary key of an edge: the ordered pair `(owner, peer)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    /// Identity that owns this edge (partition key)
    pub owner: Identity,

    /// Identity the edge points at (sort key)
    pub peer: Identity,
}

impl EdgeKey {
    /// Create a key for the edge `owner -> peer`
    pub fn new(owner: impl Into<Identity>, peer: impl Into<Identity>) -> Self {
        Self {
            owner: owner.into(),
            peer: peer.into(),
        }
    }

    /// Key of the counterpart edge `peer -> owner`
    ///
    /// # Examples
    ///
    /// ```
    /// use rapport_domain::EdgeKey;
    ///
    /// let key = EdgeKey::new("p1", "p2");
    /// assert_eq!(key.reverse(), EdgeKey::new("p2", "p1"));
    /// ```
    pub fn reverse(&self) -> Self {
        Self {
            owner: self.peer.clone(),
            peer: self.owner.clone(),
        }
    }

    /// Whether the edge would point at its own owner
    ///
    /// Reflexive edges are never created.
    pub fn is_reflexive(&self) -> bool {
        self.owner == self.peer
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.owner, self.peer)
    }
}

/// A recorded directional relationship edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipEdge {
    /// Ordered pair identifying the edge
    pub key: EdgeKey,

    /// Current state
    pub state: EdgeState,

    /// When the state last changed
    pub last_updated: Timestamp,
}

impl RelationshipEdge {
    /// Create an edge record
    pub fn new(key: EdgeKey, state: EdgeState, last_updated: Timestamp) -> Self {
        Self {
            key,
            state,
            last_updated,
        }
    }

    /// Owner of the edge
    pub fn owner(&self) -> &Identity {
        &self.key.owner
    }

    /// Peer of the edge
    pub fn peer(&self) -> &Identity {
        &self.key.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reflexive_key() {
        assert!(EdgeKey::new("p1", "p1").is_reflexive());
        assert!(!EdgeKey::new("p1", "p2").is_reflexive());
    }

    #[test]
    fn test_blank_identity() {
        assert!(Identity::new("").is_blank());
        assert!(Identity::new(" \t").is_blank());
        assert!(!Identity::new("p1").is_blank());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(EdgeKey::new("p1", "p2").to_string(), "(p1, p2)");
    }

    #[test]
    fn test_now_is_after_epoch() {
        assert!(now_millis() > 1_600_000_000_000);
    }

    proptest! {
        #[test]
        fn reverse_is_an_involution(owner in "[a-z0-9]{0,8}", peer in "[a-z0-9]{0,8}") {
            let key = EdgeKey::new(owner.as_str(), peer.as_str());
            prop_assert_eq!(key.reverse().reverse(), key.clone());
            prop_assert_eq!(key.reverse() == key, key.is_reflexive());
        }
    }
}
