//! Edge state - the three recorded stages of a directional relationship

use std::fmt;

/// State of one directional relationship edge
///
/// Absence of an edge is a valid fourth state and is never represented here:
/// - Requested: the owner asked the peer to become friends
/// - Pending: the peer asked the owner, waiting on the owner's answer
/// - Friends: the owner's side of a mutual friendship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeState {
    /// Owner requested the peer
    Requested,

    /// Peer requested the owner
    Pending,

    /// Mutual friendship (owner side)
    Friends,
}

impl EdgeState {
    /// Get the state name as stored and sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeState::Requested => "Requested",
            EdgeState::Pending => "Pending",
            EdgeState::Friends => "Friends",
        }
    }

    /// Parse a state from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Requested" => Some(EdgeState::Requested),
            "Pending" => Some(EdgeState::Pending),
            "Friends" => Some(EdgeState::Friends),
            _ => None,
        }
    }
}

impl fmt::Display for EdgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid edge state: {}", s))
    }
}
