// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user settings. Currently just the preferred output quality.

use kanva_core::KanvaError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Store the user's preferred quality label ("1K", "2K", "4K").
pub async fn set_quality(db: &Database, user_id: i64, quality: &str) -> Result<(), KanvaError> {
    let quality = quality.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_settings (user_id, quality)
                 VALUES (?1, ?2)
                 ON CONFLICT (user_id)
                 DO UPDATE SET quality = excluded.quality,
                               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![user_id, quality],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The user's stored quality label, if they set one.
pub async fn get_quality(db: &Database, user_id: i64) -> Result<Option<String>, KanvaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT quality FROM user_settings WHERE user_id = ?1")?;
            let mut rows = stmt.query_map(params![user_id], |row| row.get(0))?;
            rows.next().transpose().map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}
