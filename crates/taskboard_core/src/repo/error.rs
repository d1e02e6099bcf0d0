//! Repository error taxonomy.
//!
//! # Invariants
//! - Each variant carries enough detail (entity, field, id) for callers to
//!   map it to a user-facing response.
//! - SQLite constraint failures are classified by extended result code.

use crate::db::DbError;
use crate::model::entity::{EntityKind, ValidationError};
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Malformed input rejected before touching storage.
    Validation(ValidationError),
    /// Unique key already taken (username, email, check date, ...).
    UniqueViolation { entity: EntityKind, field: String },
    /// Dangling reference or delete of a still-referenced row.
    ReferentialIntegrity {
        entity: EntityKind,
        field: String,
        target_id: Option<i64>,
    },
    /// Operation targeted an absent id.
    NotFound { entity: EntityKind, id: i64 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    Db(DbError),
}

impl RepoError {
    /// Classifies a failed write against `entity`.
    pub(crate) fn from_write(entity: EntityKind, err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    let (table, field) = parse_unique_message(message.as_deref());
                    return Self::UniqueViolation {
                        entity: table.unwrap_or(entity),
                        field,
                    };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return Self::ReferentialIntegrity {
                        entity,
                        field: "foreign_key".to_string(),
                        target_id: None,
                    };
                }
                _ => {}
            }
        }
        Self::from(err)
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UniqueViolation { entity, field } => {
                write!(f, "{entity}.{field} must be unique")
            }
            Self::ReferentialIntegrity {
                entity,
                field,
                target_id: Some(target_id),
            } => write!(f, "{entity}.{field} references missing row {target_id}"),
            Self::ReferentialIntegrity {
                entity,
                field,
                target_id: None,
            } => write!(f, "{entity}.{field} violates referential integrity"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Parses `UNIQUE constraint failed: users.email` style messages.
///
/// Composite keys are reported as comma-joined column names.
fn parse_unique_message(message: Option<&str>) -> (Option<EntityKind>, String) {
    let Some(columns) = message.and_then(|text| text.split_once(": ").map(|(_, rest)| rest))
    else {
        return (None, "unknown".to_string());
    };

    let mut table = None;
    let mut fields = Vec::new();
    for qualified in columns.split(',').map(str::trim) {
        match qualified.split_once('.') {
            Some((table_name, column)) => {
                table = table.or_else(|| EntityKind::from_table(table_name));
                fields.push(column);
            }
            None => fields.push(qualified),
        }
    }
    (table, fields.join(","))
}

#[cfg(test)]
mod tests {
    use super::parse_unique_message;
    use crate::model::entity::EntityKind;

    #[test]
    fn unique_message_yields_table_and_column() {
        let (table, field) = parse_unique_message(Some("UNIQUE constraint failed: users.email"));
        assert_eq!(table, Some(EntityKind::User));
        assert_eq!(field, "email");
    }

    #[test]
    fn composite_unique_message_joins_columns() {
        let (table, field) = parse_unique_message(Some(
            "UNIQUE constraint failed: repeating_task_checks.task_id, repeating_task_checks.date",
        ));
        assert_eq!(table, Some(EntityKind::RepeatingTaskCheck));
        assert_eq!(field, "task_id,date");
    }

    #[test]
    fn missing_message_falls_back_to_unknown() {
        assert_eq!(parse_unique_message(None), (None, "unknown".to_string()));
    }
}
