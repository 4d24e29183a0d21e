// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use kanva_core::KanvaError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection.
///
/// Query modules accept `&Database` and call through [`Database::connection`].
/// tokio-rusqlite serializes all closure calls on one background thread,
/// which eliminates SQLITE_BUSY errors under concurrent access.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, KanvaError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| KanvaError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path).await.map_err(map_open_err)?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
        })
        .await
        .map_err(map_tr_err)?;
        migrate(&conn).await?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database, used by tests.
    pub async fn open_in_memory() -> Result<Self, KanvaError> {
        let conn = Connection::open_in_memory().await.map_err(map_open_err)?;
        conn.call(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
            .await
            .map_err(map_tr_err)?;
        migrate(&conn).await?;
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL ahead of process shutdown.
    pub async fn close(&self) -> Result<(), KanvaError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Run pending migrations on the connection's background thread. The
/// closure already produces a [`KanvaError`], so unwrap it instead of
/// wrapping it a second time.
async fn migrate(conn: &Connection) -> Result<(), KanvaError> {
    conn.call(migrations::run_migrations)
        .await
        .map_err(|err| match err {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => KanvaError::Storage {
                source: other.to_string().into(),
            },
        })
}

fn map_open_err(err: rusqlite::Error) -> KanvaError {
    KanvaError::Storage {
        source: Box::new(err),
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> KanvaError {
    KanvaError::Storage {
        source: Box::new(err),
    }
}
