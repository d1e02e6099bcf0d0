//! Repeating ("habit") task model and recurrence pattern.
//!
//! # Invariants
//! - Weekday indices are `0..=6` with `0 = Monday`, stored sorted and
//!   deduplicated; an empty set is stored as "no weekday set".
//! - `interval_days` is at least 1 when present.
//! - Both pattern fields may be present; evaluation consults the weekday set
//!   first (see `crate::recurrence`).

use crate::model::entity::{
    require_text, utc_now, EntityKind, ProjectId, RepeatingTaskCheckId, RepeatingTaskId,
    ValidationError,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const REPEATING_TITLE_MAX_CHARS: usize = 100;
pub const MAX_WEEKDAY_INDEX: u8 = 6;

/// Resolved scheduling rule for one repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence<'a> {
    /// Due on the listed weekdays (`0 = Monday`).
    Weekdays(&'a [u8]),
    /// Due every N days counted from the creation date.
    EveryNDays(i64),
    /// No pattern configured; never due.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatingTask {
    pub id: RepeatingTaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub days_of_week: Option<Vec<u8>>,
    pub interval_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepeatingTask {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub days_of_week: Option<Vec<u8>>,
    pub interval_days: Option<i64>,
}

impl NewRepeatingTask {
    /// Creates input without a pattern; set `days_of_week` or
    /// `interval_days` before persisting.
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            created_at: utc_now(),
            days_of_week: None,
            interval_days: None,
        }
    }

    pub fn on_weekdays(mut self, days: impl Into<Vec<u8>>) -> Self {
        self.days_of_week = Some(days.into());
        self
    }

    pub fn every_n_days(mut self, interval: i64) -> Self {
        self.interval_days = Some(interval);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_pattern(self.days_of_week.as_deref(), self.interval_days)
    }

    /// Sorts and deduplicates weekdays; an empty set becomes `None`.
    pub(crate) fn normalize(&mut self) {
        self.days_of_week = normalize_weekdays(self.days_of_week.take());
    }

    pub(crate) fn into_task(self, id: RepeatingTaskId) -> RepeatingTask {
        RepeatingTask {
            id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
            days_of_week: self.days_of_week,
            interval_days: self.interval_days,
        }
    }
}

impl RepeatingTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_pattern(self.days_of_week.as_deref(), self.interval_days)
    }

    pub(crate) fn normalize(&mut self) {
        self.days_of_week = normalize_weekdays(self.days_of_week.take());
    }

    /// Resolves the effective scheduling rule.
    pub fn recurrence(&self) -> Recurrence<'_> {
        match (self.days_of_week.as_deref(), self.interval_days) {
            (Some(days), _) if !days.is_empty() => Recurrence::Weekdays(days),
            (_, Some(interval)) => Recurrence::EveryNDays(interval),
            _ => Recurrence::Never,
        }
    }

    /// Returns whether both pattern fields are configured.
    pub fn has_conflicting_pattern(&self) -> bool {
        has_conflicting_pattern(self.days_of_week.as_deref(), self.interval_days)
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date()
    }
}

/// One completion mark for a repeating task on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatingTaskCheck {
    pub id: RepeatingTaskCheckId,
    pub task_id: RepeatingTaskId,
    pub date: NaiveDate,
}

pub(crate) fn has_conflicting_pattern(days: Option<&[u8]>, interval: Option<i64>) -> bool {
    days.is_some_and(|days| !days.is_empty()) && interval.is_some()
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    require_text(
        EntityKind::RepeatingTask,
        "title",
        title,
        REPEATING_TITLE_MAX_CHARS,
    )
}

fn validate_pattern(days: Option<&[u8]>, interval: Option<i64>) -> Result<(), ValidationError> {
    if let Some(day) = days
        .unwrap_or_default()
        .iter()
        .find(|day| **day > MAX_WEEKDAY_INDEX)
    {
        return Err(ValidationError::new(
            EntityKind::RepeatingTask,
            "days_of_week",
            format!("weekday index {day} is outside 0..=6"),
        ));
    }

    if let Some(interval) = interval.filter(|value| *value < 1) {
        return Err(ValidationError::new(
            EntityKind::RepeatingTask,
            "interval_days",
            format!("interval must be at least 1 day, got {interval}"),
        ));
    }

    Ok(())
}

fn normalize_weekdays(days: Option<Vec<u8>>) -> Option<Vec<u8>> {
    let mut days = days?;
    days.sort_unstable();
    days.dedup();
    if days.is_empty() {
        None
    } else {
        Some(days)
    }
}
