//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Isolate SQLite query details from service orchestration.
//! - Run every write as one `IMMEDIATE` transaction.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Deletes go through `cascade` routines, children before parents.
//! - Constraint failures surface as taxonomy errors, not raw SQLite errors.

use crate::db::migrations::{current_user_version, latest_version};
use crate::model::entity::EntityKind;
use rusqlite::{Connection, Params, Transaction, TransactionBehavior};

pub mod cascade;
pub mod document_repo;
pub mod error;
pub mod project_repo;
pub mod repeating_repo;
pub mod tag_repo;
pub mod task_repo;
pub mod user_repo;

pub use error::{RepoError, RepoResult};

/// Rejects connections that were not opened through `db::open_db*`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual = current_user_version(conn)?;
    let expected = latest_version();
    if actual != expected {
        return Err(RepoError::UninitializedConnection {
            expected_version: expected,
            actual_version: actual,
        });
    }
    Ok(())
}

/// Starts a write transaction that takes the database write lock up front.
pub(crate) fn begin_write(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Immediate,
    )?)
}

/// Runs a single-row `UPDATE` in its own write transaction.
///
/// Fails with `NotFound` when no row matched `id`.
pub(crate) fn update_row(
    conn: &Connection,
    entity: EntityKind,
    id: i64,
    sql: &str,
    bind: impl Params,
) -> RepoResult<()> {
    let tx = begin_write(conn)?;
    let changed = tx
        .execute(sql, bind)
        .map_err(|err| RepoError::from_write(entity, err))?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    tx.commit()?;
    Ok(())
}

pub(crate) fn row_exists(conn: &Connection, entity: EntityKind, id: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
            entity.table()
        ),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Fails with `NotFound` when `id` is absent.
pub(crate) fn ensure_exists(conn: &Connection, entity: EntityKind, id: i64) -> RepoResult<()> {
    if row_exists(conn, entity, id)? {
        Ok(())
    } else {
        Err(RepoError::NotFound { entity, id })
    }
}

/// Fails with `ReferentialIntegrity` when the parent row for `field` is absent.
pub(crate) fn ensure_parent(
    conn: &Connection,
    entity: EntityKind,
    field: &'static str,
    parent: EntityKind,
    parent_id: i64,
) -> RepoResult<()> {
    if row_exists(conn, parent, parent_id)? {
        Ok(())
    } else {
        Err(RepoError::ReferentialIntegrity {
            entity,
            field: field.to_string(),
            target_id: Some(parent_id),
        })
    }
}

/// Maps a persisted `0/1` flag, rejecting anything else.
pub(crate) fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
