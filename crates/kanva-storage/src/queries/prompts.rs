// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saved prompts and per-user prompt history.
//!
//! Saved prompts follow the same one-default discipline as backend
//! services: saving makes the new prompt the default, and deleting the
//! default promotes the most recently created survivor. The default
//! prompt is the fallback for image-only requests.

use kanva_core::KanvaError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{HistoryPrompt, SavedPrompt};

/// Prompt history is capped per user; oldest entries are trimmed on insert.
const HISTORY_LIMIT: i64 = 50;

const PROMPT_COLUMNS: &str = "id, user_id, name, content, is_default, created_at";

fn row_to_prompt(row: &rusqlite::Row<'_>) -> Result<SavedPrompt, rusqlite::Error> {
    Ok(SavedPrompt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        content: row.get(3)?,
        is_default: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Save (or overwrite) a named prompt and make it the user's default.
pub async fn save_prompt(
    db: &Database,
    user_id: i64,
    name: &str,
    content: &str,
) -> Result<(), KanvaError> {
    let name = name.to_string();
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE saved_prompts SET is_default = 0 WHERE user_id = ?1",
                params![user_id],
            )?;
            tx.execute(
                "INSERT INTO saved_prompts (user_id, name, content, is_default)
                 VALUES (?1, ?2, ?3, 1)
                 ON CONFLICT (user_id, name)
                 DO UPDATE SET content = excluded.content, is_default = 1",
                params![user_id, name, content],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All of a user's saved prompts, default first, then newest first.
pub async fn list_prompts(db: &Database, user_id: i64) -> Result<Vec<SavedPrompt>, KanvaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMPT_COLUMNS} FROM saved_prompts
                 WHERE user_id = ?1 ORDER BY is_default DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map(params![user_id], row_to_prompt)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a saved prompt by name.
pub async fn get_prompt(
    db: &Database,
    user_id: i64,
    name: &str,
) -> Result<Option<SavedPrompt>, KanvaError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMPT_COLUMNS} FROM saved_prompts
                 WHERE user_id = ?1 AND name = ?2"
            ))?;
            let mut rows = stmt.query_map(params![user_id, name], row_to_prompt)?;
            rows.next().transpose().map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// The user's default prompt, if any.
pub async fn get_default_prompt(
    db: &Database,
    user_id: i64,
) -> Result<Option<SavedPrompt>, KanvaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMPT_COLUMNS} FROM saved_prompts
                 WHERE user_id = ?1 AND is_default = 1"
            ))?;
            let mut rows = stmt.query_map(params![user_id], row_to_prompt)?;
            rows.next().transpose().map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a saved prompt. Returns `false` when no such prompt exists.
///
/// Deleting the default promotes the most recently created remaining
/// prompt, keeping the one-default invariant.
pub async fn delete_prompt(db: &Database, user_id: i64, name: &str) -> Result<bool, KanvaError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM saved_prompts WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
            )?;
            if deleted == 0 {
                tx.commit()?;
                return Ok(false);
            }
            let has_default: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM saved_prompts
                 WHERE user_id = ?1 AND is_default = 1)",
                params![user_id],
                |row| row.get(0),
            )?;
            if !has_default {
                tx.execute(
                    "UPDATE saved_prompts SET is_default = 1
                     WHERE id = (SELECT id FROM saved_prompts
                                 WHERE user_id = ?1
                                 ORDER BY id DESC LIMIT 1)",
                    params![user_id],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a prompt to the user's history, trimming past the cap.
pub async fn add_history(db: &Database, user_id: i64, prompt: &str) -> Result<(), KanvaError> {
    let prompt = prompt.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO prompt_history (user_id, prompt) VALUES (?1, ?2)",
                params![user_id, prompt],
            )?;
            tx.execute(
                "DELETE FROM prompt_history
                 WHERE user_id = ?1 AND id NOT IN (
                     SELECT id FROM prompt_history
                     WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2
                 )",
                params![user_id, HISTORY_LIMIT],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The user's most recent prompts, newest first.
pub async fn recent_history(
    db: &Database,
    user_id: i64,
    limit: i64,
) -> Result<Vec<HistoryPrompt>, KanvaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, prompt, created_at
                 FROM prompt_history WHERE user_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit], |row| {
                    Ok(HistoryPrompt {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        prompt: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
