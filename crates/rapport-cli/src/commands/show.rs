//! Show command implementation.

use crate::cli::ShowArgs;
use crate::error::Result;
use crate::output;
use rapport_domain::{EdgeKey, Identity, RelationshipStore};

/// Render one edge's state, or every edge the player owns.
pub fn execute_show<S>(args: ShowArgs, store: &S) -> Result<String>
where
    S: RelationshipStore<Error = rapport_store::StoreError>,
{
    match args.friend {
        Some(friend) => {
            let key = EdgeKey::new(args.player, friend);
            let edge = store.get_edge(&key)?;
            Ok(output::state(edge.map(|e| e.state)))
        }
        None => {
            let edges = store.list_edges(&Identity::new(args.player))?;
            output::edges(&edges)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapport_domain::{ConditionalWrite, EdgeState};
    use rapport_store::SqliteStore;

    #[test]
    fn test_show_single_edge() {
        let store = SqliteStore::new(":memory:").unwrap();
        store
            .apply(&ConditionalWrite::create(EdgeKey::new("p1", "p2"), EdgeState::Requested, 1))
            .unwrap();

        let shown = |friend: &str| {
            execute_show(
                ShowArgs {
                    player: "p1".into(),
                    friend: Some(friend.into()),
                },
                &store,
            )
            .unwrap()
        };

        assert_eq!(shown("p2"), "Requested");
        assert_eq!(shown("p3"), "Absent");
    }

    #[test]
    fn test_show_all_edges() {
        let store = SqliteStore::new(":memory:").unwrap();
        for peer in ["p2", "p3"] {
            store
                .apply(&ConditionalWrite::create(EdgeKey::new("p1", peer), EdgeState::Friends, 1))
                .unwrap();
        }

        let rendered = execute_show(
            ShowArgs {
                player: "p1".into(),
                friend: None,
            },
            &store,
        )
        .unwrap();
        let edges: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(edges.as_array().map(Vec::len), Some(2));
    }
}
