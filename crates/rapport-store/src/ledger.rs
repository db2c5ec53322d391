//! Delivery bookkeeping on SQLite: action queue, stream checkpoints, dead letters

use crate::{SqliteStore, StoreError};
use rapport_domain::{now_millis, DeadLetter, DeliveryLedger, QueuedMessage};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::time::Duration;

impl DeliveryLedger for SqliteStore {
    type Error = StoreError;

    fn enqueue(&self, body: &str) -> Result<String, Self::Error> {
        let message_id = uuid::Uuid::now_v7().to_string();
        let now = now_millis() as i64;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO action_queue (message_id, body, receive_count, visible_at, enqueued_at)
             VALUES (?1, ?2, 0, ?3, ?3)",
            params![&message_id, body, now],
        )?;

        Ok(message_id)
    }

    fn receive(&self, max: usize, visibility: Duration) -> Result<Vec<QueuedMessage>, Self::Error> {
        let now = now_millis() as i64;
        let hidden_until = now + visibility.as_millis() as i64;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let messages = {
            let mut stmt = tx.prepare(
                "SELECT message_id, body, receive_count FROM action_queue
                 WHERE visible_at <= ?1 ORDER BY enqueued_at, rowid LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![now, max as i64], |row| {
                    Ok(QueuedMessage {
                        message_id: row.get(0)?,
                        body: row.get(1)?,
                        receive_count: row.get::<_, u32>(2)? + 1,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for message in &messages {
            tx.execute(
                "UPDATE action_queue SET receive_count = ?2, visible_at = ?3 WHERE message_id = ?1",
                params![&message.message_id, message.receive_count, hidden_until],
            )?;
        }
        tx.commit()?;

        Ok(messages)
    }

    fn acknowledge(&self, message_id: &str) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM action_queue WHERE message_id = ?1",
            params![message_id],
        )?;
        Ok(())
    }

    fn release(&self, message_id: &str) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE action_queue SET visible_at = 0 WHERE message_id = ?1",
            params![message_id],
        )?;
        Ok(())
    }

    fn checkpoint(&self, consumer: &str) -> Result<u64, Self::Error> {
        let conn = self.lock()?;
        let sequence: Option<i64> = conn
            .query_row(
                "SELECT sequence FROM stream_checkpoints WHERE consumer = ?1",
                params![consumer],
                |row| row.get(0),
            )
            .optional()?;
        Ok(sequence.unwrap_or(0) as u64)
    }

    fn commit_checkpoint(&self, consumer: &str, sequence: u64) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO stream_checkpoints (consumer, sequence) VALUES (?1, ?2)
             ON CONFLICT(consumer) DO UPDATE SET sequence = excluded.sequence",
            params![consumer, sequence as i64],
        )?;
        Ok(())
    }

    fn dead_letter(&self, letter: &DeadLetter) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO dead_letters (source, item_id, payload, reason, attempts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &letter.source,
                &letter.item_id,
                &letter.payload,
                &letter.reason,
                letter.attempts,
                letter.created_at as i64,
            ],
        )?;
        Ok(())
    }

    fn dead_letters(&self, limit: usize) -> Result<Vec<DeadLetter>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source, item_id, payload, reason, attempts, created_at
             FROM dead_letters ORDER BY id DESC LIMIT ?1",
        )?;

        let letters = stmt
            .query_map(params![limit as i64], |row| {
                Ok(DeadLetter {
                    source: row.get(0)?,
                    item_id: row.get(1)?,
                    payload: row.get(2)?,
                    reason: row.get(3)?,
                    attempts: row.get(4)?,
                    created_at: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(letters)
    }
}
