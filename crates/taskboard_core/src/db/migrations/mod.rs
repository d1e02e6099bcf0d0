//! Ordered schema steps for the task board database.
//!
//! # Responsibility
//! - List every schema step with its version and a short name for logs.
//! - Run the pending steps of an older database in one transaction.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` is bumped after each step inside the same
//!   transaction, so a failed step leaves the previous version in place.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "unique_checks",
        sql: include_str!("0002_unique_checks.sql"),
    },
];

/// Returns the newest schema version this build can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Upgrades the connection's schema to [`latest_version`].
///
/// Fails with [`DbError::UnsupportedSchemaVersion`] for databases written
/// by a newer build and with [`DbError::Migration`] naming the step that
/// broke.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }
    if from_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending_steps(from_version) {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| {
                error!(
                    "event=db_migrate module=db status=error version={} name={} error={source}",
                    step.version, step.name
                );
                DbError::Migration {
                    version: step.version,
                    name: step.name,
                    source,
                }
            })?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    Ok(())
}

/// Reads the schema version mirrored in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn pending_steps(from_version: u32) -> impl Iterator<Item = &'static SchemaStep> {
    SCHEMA_STEPS
        .iter()
        .filter(move |step| step.version > from_version)
}

#[cfg(test)]
mod tests {
    use super::{pending_steps, SCHEMA_STEPS};

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }

    #[test]
    fn pending_steps_skip_applied_versions() {
        let names: Vec<_> = pending_steps(1).map(|step| step.name).collect();
        assert_eq!(names, vec!["unique_checks"]);
        assert_eq!(pending_steps(2).count(), 0);
    }
}
