//! Core domain logic for the task board.
//! This crate is the single source of truth for business invariants:
//! entity ownership, cascade deletes, association rules and recurrence.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod recurrence;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::entity::{EntityKind, ValidationError};
pub use model::project::{Document, NewDocument, NewProject, Project, Tag};
pub use model::repeating::{NewRepeatingTask, Recurrence, RepeatingTask, RepeatingTaskCheck};
pub use model::task::{NewTask, Task, TaskPriority, TaskStatus};
pub use model::user::{NewUser, User};
pub use notify::{dispatch_reminders, DispatchError, DispatchReport, Reminder, ReminderDispatcher};
pub use recurrence::{due_and_unchecked, evaluate_day, is_completed, is_due, CheckLedger, DueStatus};
pub use repo::cascade::DeleteSummary;
pub use repo::repeating_repo::RepeatingScope;
pub use repo::{RepoError, RepoResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
