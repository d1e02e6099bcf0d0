//! Recurrence evaluation for repeating tasks.
//!
//! # Responsibility
//! - Decide whether a repeating task is due on a calendar date.
//! - Cross-reference check-ins to report completion per date.
//!
//! # Invariants
//! - Every function here is pure: same inputs, same output, no I/O.
//! - Evaluation never fails; malformed patterns are rejected on write.
//! - Output order follows input task order.

use crate::model::entity::RepeatingTaskId;
use crate::model::repeating::{Recurrence, RepeatingTask, RepeatingTaskCheck};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

/// Evaluation of one repeating task on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueStatus {
    pub task: RepeatingTask,
    pub due: bool,
    pub completed: bool,
}

impl DueStatus {
    /// Due and not yet checked off.
    pub fn is_pending(&self) -> bool {
        self.due && !self.completed
    }
}

/// Set of `(task, date)` pairs that have a check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckLedger {
    entries: HashSet<(RepeatingTaskId, NaiveDate)>,
}

impl CheckLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, task_id: RepeatingTaskId, date: NaiveDate) {
        self.entries.insert((task_id, date));
    }

    pub fn contains(&self, task_id: RepeatingTaskId, date: NaiveDate) -> bool {
        self.entries.contains(&(task_id, date))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<&'a RepeatingTaskCheck> for CheckLedger {
    fn from_iter<I: IntoIterator<Item = &'a RepeatingTaskCheck>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for check in iter {
            ledger.record(check.task_id, check.date);
        }
        ledger
    }
}

impl FromIterator<RepeatingTaskCheck> for CheckLedger {
    fn from_iter<I: IntoIterator<Item = RepeatingTaskCheck>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for check in iter {
            ledger.record(check.task_id, check.date);
        }
        ledger
    }
}

/// Returns whether `task` is scheduled on `date`.
///
/// - Weekday set: due iff the date's weekday (`0 = Monday`) is in the set.
/// - Interval N: due iff the day distance from the creation date is a
///   multiple of N. Dates before creation are never due.
/// - No pattern: never due.
pub fn is_due(task: &RepeatingTask, date: NaiveDate) -> bool {
    match task.recurrence() {
        Recurrence::Weekdays(days) => {
            let weekday = date.weekday().num_days_from_monday();
            days.iter().any(|day| u32::from(*day) == weekday)
        }
        Recurrence::EveryNDays(interval) => {
            if interval < 1 {
                return false;
            }
            let elapsed = (date - task.created_on()).num_days();
            elapsed >= 0 && elapsed % interval == 0
        }
        Recurrence::Never => false,
    }
}

/// Returns whether `task` has a check-in on `date`.
pub fn is_completed(ledger: &CheckLedger, task: &RepeatingTask, date: NaiveDate) -> bool {
    ledger.contains(task.id, date)
}

/// Evaluates every task for `date`, preserving input order.
pub fn evaluate_day(
    tasks: &[RepeatingTask],
    ledger: &CheckLedger,
    date: NaiveDate,
) -> Vec<DueStatus> {
    tasks
        .iter()
        .map(|task| DueStatus {
            task: task.clone(),
            due: is_due(task, date),
            completed: is_completed(ledger, task, date),
        })
        .collect()
}

/// Returns tasks due on `date` without a check-in, preserving input order.
pub fn due_and_unchecked(
    tasks: &[RepeatingTask],
    ledger: &CheckLedger,
    date: NaiveDate,
) -> Vec<RepeatingTask> {
    tasks
        .iter()
        .filter(|task| is_due(task, date) && !is_completed(ledger, task, date))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{due_and_unchecked, evaluate_day, is_completed, is_due, CheckLedger};
    use crate::model::repeating::{NewRepeatingTask, RepeatingTask, RepeatingTaskCheck};
    use chrono::{Duration, NaiveDate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn created_on(input: NewRepeatingTask, day: NaiveDate, id: i64) -> RepeatingTask {
        let mut input = input;
        input.created_at = day.and_hms_opt(9, 30, 0).unwrap();
        input.into_task(id)
    }

    fn first_monday() -> NaiveDate {
        date(2024, 1, 1)
    }

    #[test]
    fn weekday_pattern_matches_monday_and_wednesday_only() {
        let monday = first_monday();
        let task = created_on(
            NewRepeatingTask::new(1, "gym").on_weekdays([0, 2]),
            monday,
            1,
        );

        assert!(is_due(&task, monday));
        assert!(!is_due(&task, monday + Duration::days(1)));
        assert!(is_due(&task, monday + Duration::days(2)));
        assert!(is_due(&task, monday + Duration::days(7)));
    }

    #[test]
    fn weekday_pattern_ignores_creation_date() {
        let monday = first_monday();
        let task = created_on(
            NewRepeatingTask::new(1, "gym").on_weekdays([0]),
            monday,
            1,
        );
        assert!(is_due(&task, monday - Duration::days(7)));
    }

    #[test]
    fn interval_pattern_counts_from_creation_date() {
        let start = date(2024, 3, 10);
        let task = created_on(
            NewRepeatingTask::new(1, "water plants").every_n_days(3),
            start,
            1,
        );

        let due: Vec<i64> = (0..=7)
            .filter(|offset| is_due(&task, start + Duration::days(*offset)))
            .collect();
        assert_eq!(due, vec![0, 3, 6]);
        assert!(!is_due(&task, start - Duration::days(3)));
    }

    #[test]
    fn interval_of_one_is_due_every_day() {
        let start = date(2024, 2, 28);
        let task = created_on(NewRepeatingTask::new(1, "journal").every_n_days(1), start, 1);
        assert!((0..30).all(|offset| is_due(&task, start + Duration::days(offset))));
    }

    #[test]
    fn task_without_pattern_is_never_due() {
        let start = date(2024, 3, 10);
        let task = created_on(NewRepeatingTask::new(1, "someday"), start, 1);
        assert!((0..14).all(|offset| !is_due(&task, start + Duration::days(offset))));
    }

    #[test]
    fn corrupt_interval_is_never_due() {
        let start = date(2024, 3, 10);
        let mut task = created_on(NewRepeatingTask::new(1, "broken"), start, 1);
        task.interval_days = Some(0);
        assert!(!is_due(&task, start));
    }

    #[test]
    fn is_due_is_deterministic() {
        let start = date(2024, 3, 10);
        let task = created_on(
            NewRepeatingTask::new(1, "stretch").every_n_days(5),
            start,
            1,
        );
        let probe = start + Duration::days(10);
        let first = is_due(&task, probe);
        assert!((0..100).all(|_| is_due(&task, probe) == first));
    }

    #[test]
    fn evaluation_reports_completion_and_keeps_input_order() {
        let monday = first_monday();
        let daily = created_on(NewRepeatingTask::new(1, "daily").every_n_days(1), monday, 10);
        let fridays = created_on(
            NewRepeatingTask::new(1, "fridays").on_weekdays([4]),
            monday,
            11,
        );
        let mondays = created_on(
            NewRepeatingTask::new(1, "mondays").on_weekdays([0]),
            monday,
            12,
        );
        let tasks = vec![daily, fridays, mondays];
        let ledger: CheckLedger = [RepeatingTaskCheck {
            id: 1,
            task_id: 10,
            date: monday,
        }]
        .into_iter()
        .collect();

        assert!(is_completed(&ledger, &tasks[0], monday));
        assert!(!is_completed(&ledger, &tasks[0], monday + Duration::days(1)));

        let statuses = evaluate_day(&tasks, &ledger, monday);
        let summary: Vec<(i64, bool, bool)> = statuses
            .iter()
            .map(|status| (status.task.id, status.due, status.completed))
            .collect();
        assert_eq!(
            summary,
            vec![(10, true, true), (11, false, false), (12, true, false)]
        );

        let pending = due_and_unchecked(&tasks, &ledger, monday);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, 12);
    }
}
