//! Task model with priority/status lifecycle.
//!
//! # Invariants
//! - `priority` defaults to `Medium`, `status` defaults to `Backlog`.
//! - A task belongs to exactly one project; linked tags and documents must
//!   belong to the same project.

use crate::model::entity::{require_text, utc_now, EntityKind, ProjectId, TaskId, ValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const TASK_TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for TaskPriority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ValidationError::new(
                EntityKind::Task,
                "priority",
                format!("unsupported value `{other}`; expected low|medium|high"),
            )),
        }
    }
}

/// Board column a task sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Listed but not started.
    #[default]
    Backlog,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    /// Accepts both `in_progress` and the form value `in-progress`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "backlog" => Ok(Self::Backlog),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(ValidationError::new(
                EntityKind::Task,
                "status",
                format!("unsupported value `{other}`; expected backlog|in-progress|done"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

impl NewTask {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            deadline: None,
            created_at: utc_now(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_task_title(&self.title)
    }

    pub(crate) fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
            deadline: self.deadline,
            created_at: self.created_at,
        }
    }
}

impl Task {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_task_title(&self.title)
    }

    /// Returns whether the deadline has passed on `today` without the task
    /// being done.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Done && self.deadline.is_some_and(|deadline| deadline < today)
    }
}

fn validate_task_title(title: &str) -> Result<(), ValidationError> {
    require_text(EntityKind::Task, "title", title, TASK_TITLE_MAX_CHARS)
}
