//! Repeating task ("habit") use-case service.
//!
//! # Responsibility
//! - Create and edit repeating tasks with validated recurrence patterns.
//! - Check tasks off per day and build daily views from the evaluator.
//!
//! # Invariants
//! - Day views preserve repository order (project, creation time, id).
//! - Toggling twice on the same day restores the original state.

use crate::model::entity::{EntityKind, RepeatingTaskId};
use crate::model::repeating::{NewRepeatingTask, RepeatingTask, RepeatingTaskCheck};
use crate::recurrence::{self, CheckLedger, DueStatus};
use crate::repo::cascade::DeleteSummary;
use crate::repo::repeating_repo::{RepeatingScope, RepeatingTaskRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::normalize_optional;
use chrono::NaiveDate;

/// Result of toggling a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckToggle {
    Checked,
    Unchecked,
}

/// One day of a repeating task's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMark {
    pub date: NaiveDate,
    pub due: bool,
    pub completed: bool,
}

pub struct HabitService<R: RepeatingTaskRepository> {
    repo: R,
}

impl<R: RepeatingTaskRepository> HabitService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create(&self, task: NewRepeatingTask) -> RepoResult<RepeatingTask> {
        let task = NewRepeatingTask {
            title: task.title.trim().to_string(),
            description: normalize_optional(task.description),
            ..task
        };
        self.repo.create_repeating_task(&task)
    }

    pub fn get(&self, id: RepeatingTaskId) -> RepoResult<RepeatingTask> {
        self.repo.get_repeating_task(id)?.ok_or(RepoError::NotFound {
            entity: EntityKind::RepeatingTask,
            id,
        })
    }

    pub fn list(&self, scope: RepeatingScope) -> RepoResult<Vec<RepeatingTask>> {
        self.repo.list_repeating_tasks(scope)
    }

    pub fn update(&self, task: &RepeatingTask) -> RepoResult<RepeatingTask> {
        let mut task = task.clone();
        task.title = task.title.trim().to_string();
        task.description = normalize_optional(task.description.take());
        self.repo.update_repeating_task(&task)?;
        self.get(task.id)
    }

    pub fn delete(&self, id: RepeatingTaskId) -> RepoResult<DeleteSummary> {
        self.repo.delete_repeating_task(id)
    }

    /// Records completion for `date`; a second check-in fails with
    /// `UniqueViolation`.
    pub fn check_in(
        &self,
        id: RepeatingTaskId,
        date: NaiveDate,
    ) -> RepoResult<RepeatingTaskCheck> {
        self.repo.add_check(id, date)
    }

    /// Checks the task off for `date`, or clears an existing check-in.
    pub fn toggle_check(&self, id: RepeatingTaskId, date: NaiveDate) -> RepoResult<CheckToggle> {
        if self.repo.toggle_check(id, date)? {
            Ok(CheckToggle::Checked)
        } else {
            Ok(CheckToggle::Unchecked)
        }
    }

    /// Evaluates every repeating task in `scope` for `date`.
    pub fn day_overview(
        &self,
        scope: RepeatingScope,
        date: NaiveDate,
    ) -> RepoResult<Vec<DueStatus>> {
        let tasks = self.repo.list_repeating_tasks(scope)?;
        let ledger: CheckLedger = self.repo.list_checks_on(scope, date)?.into_iter().collect();
        Ok(recurrence::evaluate_day(&tasks, &ledger, date))
    }

    /// Tasks in `scope` due on `date` and not yet checked off.
    pub fn due_and_unchecked(
        &self,
        scope: RepeatingScope,
        date: NaiveDate,
    ) -> RepoResult<Vec<RepeatingTask>> {
        due_and_unchecked_in(&self.repo, scope, date)
    }

    /// Day-by-day marks for one task over `from..=to`.
    pub fn history(
        &self,
        id: RepeatingTaskId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<DayMark>> {
        let task = self.get(id)?;
        let ledger: CheckLedger = self.repo.list_checks(id, from, to)?.into_iter().collect();
        Ok(from
            .iter_days()
            .take_while(|date| *date <= to)
            .map(|date| DayMark {
                date,
                due: recurrence::is_due(&task, date),
                completed: recurrence::is_completed(&ledger, &task, date),
            })
            .collect())
    }
}

/// Repeating tasks in `scope` (a project or all of a user's projects) due on
/// `date` without a check-in, in repository order.
pub fn due_and_unchecked_in<R: RepeatingTaskRepository>(
    repo: &R,
    scope: RepeatingScope,
    date: NaiveDate,
) -> RepoResult<Vec<RepeatingTask>> {
    let tasks = repo.list_repeating_tasks(scope)?;
    let ledger: CheckLedger = repo.list_checks_on(scope, date)?.into_iter().collect();
    Ok(recurrence::due_and_unchecked(&tasks, &ledger, date))
}
