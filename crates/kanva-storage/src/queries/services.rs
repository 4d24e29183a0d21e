// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRUD operations for user-registered backend services.
//!
//! Invariant: each user has at most one default service, and a user with
//! at least one service always has exactly one default. Mutations that
//! touch the default flag run inside a transaction.

use kanva_core::KanvaError;
use kanva_core::types::{BackendService, BackendVariant};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Field set for inserting a new service. The default flag and timestamps
/// are managed by the queries, not by callers.
#[derive(Debug, Clone)]
pub struct NewBackendService {
    pub owner_user_id: i64,
    pub name: String,
    pub variant: BackendVariant,
    pub api_key: String,
    pub base_url: String,
    pub project_id: String,
    pub location: String,
    pub model: String,
}

fn row_to_service(row: &rusqlite::Row<'_>) -> Result<BackendService, rusqlite::Error> {
    let variant: String = row.get(3)?;
    let variant: BackendVariant = variant.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(BackendService {
        id: row.get(0)?,
        owner_user_id: row.get(1)?,
        name: row.get(2)?,
        variant,
        api_key: row.get(4)?,
        base_url: row.get(5)?,
        project_id: row.get(6)?,
        location: row.get(7)?,
        model: row.get(8)?,
        is_default: row.get(9)?,
        created_at: row.get(10)?,
    })
}

const SERVICE_COLUMNS: &str = "id, owner_user_id, name, variant, api_key, base_url, \
     project_id, location, model, is_default, created_at";

/// Insert a service and make it the owner's default.
///
/// Replaces any existing service with the same name and clears the previous
/// default in the same transaction. Returns the new service ID.
pub async fn add_service(db: &Database, service: NewBackendService) -> Result<i64, KanvaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM backend_services WHERE owner_user_id = ?1 AND name = ?2",
                params![service.owner_user_id, service.name],
            )?;
            tx.execute(
                "UPDATE backend_services SET is_default = 0 WHERE owner_user_id = ?1",
                params![service.owner_user_id],
            )?;
            tx.execute(
                "INSERT INTO backend_services
                 (owner_user_id, name, variant, api_key, base_url,
                  project_id, location, model, is_default)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)",
                params![
                    service.owner_user_id,
                    service.name,
                    service.variant.to_string(),
                    service.api_key,
                    service.base_url,
                    service.project_id,
                    service.location,
                    service.model,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// All services owned by a user, default first, then newest first.
pub async fn list_services(db: &Database, user_id: i64) -> Result<Vec<BackendService>, KanvaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SERVICE_COLUMNS} FROM backend_services
                 WHERE owner_user_id = ?1
                 ORDER BY is_default DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map(params![user_id], row_to_service)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// The user's default service, if any.
pub async fn get_default_service(
    db: &Database,
    user_id: i64,
) -> Result<Option<BackendService>, KanvaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SERVICE_COLUMNS} FROM backend_services
                 WHERE owner_user_id = ?1 AND is_default = 1"
            ))?;
            let mut rows = stmt.query_map(params![user_id], row_to_service)?;
            rows.next().transpose().map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Make the given service the user's default.
///
/// Returns `false` when the user owns no service with that id; the
/// existing default is left untouched in that case.
pub async fn set_default_service(
    db: &Database,
    user_id: i64,
    service_id: i64,
) -> Result<bool, KanvaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM backend_services
                 WHERE owner_user_id = ?1 AND id = ?2)",
                params![user_id, service_id],
                |row| row.get(0),
            )?;
            if !exists {
                tx.commit()?;
                return Ok(false);
            }
            tx.execute(
                "UPDATE backend_services SET is_default = 0 WHERE owner_user_id = ?1",
                params![user_id],
            )?;
            tx.execute(
                "UPDATE backend_services SET is_default = 1
                 WHERE owner_user_id = ?1 AND id = ?2",
                params![user_id, service_id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete one of the user's services by id.
///
/// If the deleted service was the default, the most recently created
/// remaining service (if any) is promoted so the one-default invariant
/// holds. Returns `false` when no such service exists.
pub async fn delete_service(
    db: &Database,
    user_id: i64,
    service_id: i64,
) -> Result<bool, KanvaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM backend_services WHERE owner_user_id = ?1 AND id = ?2",
                params![user_id, service_id],
            )?;
            if deleted == 0 {
                tx.commit()?;
                return Ok(false);
            }
            let has_default: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM backend_services
                 WHERE owner_user_id = ?1 AND is_default = 1)",
                params![user_id],
                |row| row.get(0),
            )?;
            if !has_default {
                tx.execute(
                    "UPDATE backend_services SET is_default = 1
                     WHERE id = (SELECT id FROM backend_services
                                 WHERE owner_user_id = ?1
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
