//! Dead-letters command implementation.

use crate::cli::DeadLettersArgs;
use crate::error::Result;
use crate::output;
use rapport_domain::DeliveryLedger;

/// Render the most recent dead letters.
pub fn execute_dead_letters<S>(args: DeadLettersArgs, ledger: &S) -> Result<String>
where
    S: DeliveryLedger<Error = rapport_store::StoreError>,
{
    let letters = ledger.dead_letters(args.limit)?;
    output::dead_letters(&letters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapport_domain::DeadLetter;
    use rapport_store::SqliteStore;

    #[test]
    fn test_lists_newest_first() {
        let store = SqliteStore::new(":memory:").unwrap();
        for item in ["1", "2"] {
            store
                .dead_letter(&DeadLetter {
                    source: "request".into(),
                    item_id: item.into(),
                    payload: "{}".into(),
                    reason: "Store error: timeout".into(),
                    attempts: 2,
                    created_at: 10,
                })
                .unwrap();
        }

        let rendered = execute_dead_letters(DeadLettersArgs { limit: 1 }, &store).unwrap();
        let letters: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(letters.as_array().map(Vec::len), Some(1));
        assert_eq!(letters[0]["item_id"], "2");
    }
}
