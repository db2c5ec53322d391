//! JSON rendering for command output.

use crate::error::Result;
use rapport_domain::{DeadLetter, EdgeState, RelationshipEdge};

/// Render edges as a JSON array.
pub fn edges(edges: &[RelationshipEdge]) -> Result<String> {
    let values: Vec<serde_json::Value> = edges
        .iter()
        .map(|e| {
            serde_json::json!({
                "player_id": e.owner().as_str(),
                "friend_id": e.peer().as_str(),
                "state": e.state.as_str(),
                "last_updated": e.last_updated,
            })
        })
        .collect();

    Ok(serde_json::to_string_pretty(&values)?)
}

/// Render a single edge state, `Absent` when there is no edge.
pub fn state(state: Option<EdgeState>) -> String {
    state.map_or("Absent", |s| s.as_str()).to_string()
}

/// Render dead letters as a JSON array.
pub fn dead_letters(letters: &[DeadLetter]) -> Result<String> {
    let values: Vec<serde_json::Value> = letters
        .iter()
        .map(|l| {
            serde_json::json!({
                "source": l.source,
                "item_id": l.item_id,
                "payload": l.payload,
                "reason": l.reason,
                "attempts": l.attempts,
                "created_at": l.created_at,
            })
        })
        .collect();

    Ok(serde_json::to_string_pretty(&values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapport_domain::EdgeKey;

    #[test]
    fn test_state() {
        assert_eq!(state(None), "Absent");
        assert_eq!(state(Some(EdgeState::Pending)), "Pending");
    }

    #[test]
    fn test_edges_json() {
        let edge = RelationshipEdge::new(EdgeKey::new("p1", "p2"), EdgeState::Friends, 42);
        let rendered: serde_json::Value = serde_json::from_str(&edges(&[edge]).unwrap()).unwrap();

        assert_eq!(rendered[0]["friend_id"], "p2");
        assert_eq!(rendered[0]["state"], "Friends");
        assert_eq!(rendered[0]["last_updated"], 42);
    }
}
