//! Entity identity and shared validation primitives.

use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type UserId = i64;
pub type ProjectId = i64;
pub type TaskId = i64;
pub type TagId = i64;
pub type DocumentId = i64;
pub type RepeatingTaskId = i64;
pub type RepeatingTaskCheckId = i64;

/// Entity types known by the store, used to label errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Project,
    Task,
    Tag,
    Document,
    RepeatingTask,
    RepeatingTaskCheck,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Task => "task",
            Self::Tag => "tag",
            Self::Document => "document",
            Self::RepeatingTask => "repeating_task",
            Self::RepeatingTaskCheck => "repeating_task_check",
        }
    }

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Project => "projects",
            Self::Task => "tasks",
            Self::Tag => "tags",
            Self::Document => "documents",
            Self::RepeatingTask => "repeating_tasks",
            Self::RepeatingTaskCheck => "repeating_task_checks",
        }
    }

    /// Resolves a table name reported by SQLite back to its entity.
    pub fn from_table(table: &str) -> Option<Self> {
        [
            Self::User,
            Self::Project,
            Self::Task,
            Self::Tag,
            Self::Document,
            Self::RepeatingTask,
            Self::RepeatingTaskCheck,
        ]
        .into_iter()
        .find(|kind| kind.table() == table)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed input for one field of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub entity: EntityKind,
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(entity: EntityKind, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            entity,
            field,
            reason: reason.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}.{}: {}", self.entity, self.field, self.reason)
    }
}

impl Error for ValidationError {}

/// Rejects blank values and values longer than `max_chars`.
pub(crate) fn require_text(
    entity: EntityKind,
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(entity, field, "must not be blank"));
    }
    limit_text(entity, field, Some(value), max_chars)
}

/// Rejects values longer than `max_chars`; `None` always passes.
pub(crate) fn limit_text(
    entity: EntityKind,
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.chars().count() > max_chars => Err(ValidationError::new(
            entity,
            field,
            format!("must be at most {max_chars} characters"),
        )),
        _ => Ok(()),
    }
}

/// Creation timestamps are naive UTC, second precision.
pub(crate) fn utc_now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::{limit_text, require_text, EntityKind};

    #[test]
    fn table_names_resolve_back_to_entities() {
        assert_eq!(EntityKind::from_table("tasks"), Some(EntityKind::Task));
        assert_eq!(
            EntityKind::from_table("repeating_task_checks"),
            Some(EntityKind::RepeatingTaskCheck)
        );
        assert_eq!(EntityKind::from_table("task_tags"), None);
    }

    #[test]
    fn require_text_rejects_blank_and_overlong_values() {
        let blank = require_text(EntityKind::Tag, "name", "   ", 50).unwrap_err();
        assert_eq!(blank.field, "name");
        assert!(blank.reason.contains("blank"));

        let long = "x".repeat(51);
        let err = require_text(EntityKind::Tag, "name", &long, 50).unwrap_err();
        assert!(err.reason.contains("50"));

        assert!(limit_text(EntityKind::Tag, "name", None, 1).is_ok());
    }
}
