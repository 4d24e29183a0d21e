// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable queue of generations that exhausted their live attempts.
//!
//! Rows survive restarts; the replay loop picks one at random per pass and
//! deletes it on success (or on a corrupt payload). There is no retry cap,
//! only the `retry_count` counter for operator visibility.

use kanva_core::KanvaError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::FailedGeneration;

fn row_to_failed(row: &rusqlite::Row<'_>) -> Result<FailedGeneration, rusqlite::Error> {
    Ok(FailedGeneration {
        id: row.get(0)?,
        user_id: row.get(1)?,
        chat_id: row.get(2)?,
        reply_to_message_id: row.get(3)?,
        payload: row.get(4)?,
        last_error: row.get(5)?,
        retry_count: row.get(6)?,
        created_at: row.get(7)?,
        last_retry_at: row.get(8)?,
    })
}

const FAILED_COLUMNS: &str = "id, user_id, chat_id, reply_to_message_id, payload, \
     last_error, retry_count, created_at, last_retry_at";

/// Enqueue a failed generation. Returns the new row ID.
pub async fn enqueue(
    db: &Database,
    user_id: i64,
    chat_id: i64,
    reply_to_message_id: i32,
    payload: &str,
    last_error: &str,
) -> Result<i64, KanvaError> {
    let payload = payload.to_string();
    let last_error = last_error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO failed_generations
                 (user_id, chat_id, reply_to_message_id, payload, last_error)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, chat_id, reply_to_message_id, payload, last_error],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Pick one pending entry uniformly at random, or `None` if the queue is
/// empty.
pub async fn pick_random(db: &Database) -> Result<Option<FailedGeneration>, KanvaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FAILED_COLUMNS} FROM failed_generations
                 ORDER BY RANDOM() LIMIT 1"
            ))?;
            let mut rows = stmt.query_map([], row_to_failed)?;
            rows.next().transpose().map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed replay attempt: bump `retry_count`, stamp
/// `last_retry_at`, and keep the newest provider error verbatim.
pub async fn mark_retry(db: &Database, id: i64, last_error: &str) -> Result<(), KanvaError> {
    let last_error = last_error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE failed_generations
                 SET retry_count = retry_count + 1,
                     last_error = ?1,
                     last_retry_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![last_error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove an entry, after a successful replay or a corrupt payload.
pub async fn delete(db: &Database, id: i64) -> Result<(), KanvaError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM failed_generations WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Number of entries waiting for replay.
pub async fn count(db: &Database) -> Result<i64, KanvaError> {
    db.connection()
        .call(move |conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM failed_generations", [], |row| {
                row.get(0)
            })?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
