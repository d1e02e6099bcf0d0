//! Repeating task and check-in repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist repeating tasks with their recurrence pattern.
//! - Record one check-in per task per calendar day.
//!
//! # Invariants
//! - Weekday sets are stored as JSON arrays, sorted and deduplicated.
//! - A second check-in for the same `(task, date)` fails with
//!   `UniqueViolation`.
//! - Listing order is stable: project id, creation time, id.

use crate::model::entity::{EntityKind, ProjectId, RepeatingTaskId, UserId};
use crate::model::repeating::{
    has_conflicting_pattern, NewRepeatingTask, RepeatingTask, RepeatingTaskCheck,
};
use crate::repo::cascade::{self, DeleteSummary};
use crate::repo::{
    begin_write, ensure_connection_ready, ensure_exists, ensure_parent, update_row, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};

const REPEATING_SELECT_SQL: &str = "SELECT
    r.id AS id,
    r.project_id AS project_id,
    r.title AS title,
    r.description AS description,
    r.created_at AS created_at,
    r.days_of_week AS days_of_week,
    r.interval_days AS interval_days
FROM repeating_tasks r";

/// Which repeating tasks a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatingScope {
    Project(ProjectId),
    /// Every project owned by the user.
    User(UserId),
}

impl RepeatingScope {
    fn filter_sql(self) -> (&'static str, i64) {
        match self {
            Self::Project(id) => ("r.project_id = ?1", id),
            Self::User(id) => (
                "r.project_id IN (SELECT id FROM projects WHERE user_id = ?1)",
                id,
            ),
        }
    }
}

pub trait RepeatingTaskRepository {
    fn create_repeating_task(&self, task: &NewRepeatingTask) -> RepoResult<RepeatingTask>;
    fn get_repeating_task(&self, id: RepeatingTaskId) -> RepoResult<Option<RepeatingTask>>;
    fn list_repeating_tasks(&self, scope: RepeatingScope) -> RepoResult<Vec<RepeatingTask>>;
    /// Replaces title, description and pattern.
    fn update_repeating_task(&self, task: &RepeatingTask) -> RepoResult<()>;
    fn delete_repeating_task(&self, id: RepeatingTaskId) -> RepoResult<DeleteSummary>;

    /// Records a check-in; duplicates fail with `UniqueViolation`.
    fn add_check(&self, task_id: RepeatingTaskId, date: NaiveDate)
        -> RepoResult<RepeatingTaskCheck>;
    /// Removes a check-in; returns `false` when none existed.
    fn remove_check(&self, task_id: RepeatingTaskId, date: NaiveDate) -> RepoResult<bool>;
    /// Flips the check-in for `date`; returns `true` when it is now checked.
    fn toggle_check(&self, task_id: RepeatingTaskId, date: NaiveDate) -> RepoResult<bool>;
    /// Lists check-ins of one task within `from..=to`, oldest first.
    fn list_checks(
        &self,
        task_id: RepeatingTaskId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<RepeatingTaskCheck>>;
    /// Lists check-ins on `date` for every task in `scope`.
    fn list_checks_on(
        &self,
        scope: RepeatingScope,
        date: NaiveDate,
    ) -> RepoResult<Vec<RepeatingTaskCheck>>;
}

pub struct SqliteRepeatingTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepeatingTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn collect_checks(
        &self,
        sql: &str,
        bind: impl rusqlite::Params,
    ) -> RepoResult<Vec<RepeatingTaskCheck>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut checks = Vec::new();
        while let Some(row) = rows.next()? {
            checks.push(RepeatingTaskCheck {
                id: row.get("id")?,
                task_id: row.get("task_id")?,
                date: row.get("date")?,
            });
        }
        Ok(checks)
    }
}

impl RepeatingTaskRepository for SqliteRepeatingTaskRepository<'_> {
    fn create_repeating_task(&self, task: &NewRepeatingTask) -> RepoResult<RepeatingTask> {
        let mut task = task.clone();
        task.normalize();
        task.validate()?;
        let days_json = encode_weekdays(task.days_of_week.as_deref())?;

        let tx = begin_write(self.conn)?;
        ensure_parent(
            &tx,
            EntityKind::RepeatingTask,
            "project_id",
            EntityKind::Project,
            task.project_id,
        )?;
        tx.execute(
            "INSERT INTO repeating_tasks (
                project_id,
                title,
                description,
                created_at,
                days_of_week,
                interval_days
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                task.project_id,
                task.title.as_str(),
                task.description.as_deref(),
                task.created_at,
                days_json,
                task.interval_days,
            ],
        )
        .map_err(|err| RepoError::from_write(EntityKind::RepeatingTask, err))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        warn_on_conflicting_pattern(id, task.days_of_week.as_deref(), task.interval_days);
        Ok(task.into_task(id))
    }

    fn get_repeating_task(&self, id: RepeatingTaskId) -> RepoResult<Option<RepeatingTask>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REPEATING_SELECT_SQL} WHERE r.id = ?1;"))?;
        let task = stmt
            .query_row([id], |row| Ok(parse_repeating_row(row)))
            .optional()?;
        task.transpose()
    }

    fn list_repeating_tasks(&self, scope: RepeatingScope) -> RepoResult<Vec<RepeatingTask>> {
        let (filter, id) = scope.filter_sql();
        let mut stmt = self.conn.prepare(&format!(
            "{REPEATING_SELECT_SQL}
             WHERE {filter}
             ORDER BY r.project_id ASC, r.created_at ASC, r.id ASC;"
        ))?;
        let mut rows = stmt.query([id])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_repeating_row(row)?);
        }
        Ok(tasks)
    }

    fn update_repeating_task(&self, task: &RepeatingTask) -> RepoResult<()> {
        let mut task = task.clone();
        task.normalize();
        task.validate()?;
        let days_json = encode_weekdays(task.days_of_week.as_deref())?;

        update_row(
            self.conn,
            EntityKind::RepeatingTask,
            task.id,
            "UPDATE repeating_tasks
             SET
                title = ?1,
                description = ?2,
                days_of_week = ?3,
                interval_days = ?4
             WHERE id = ?5;",
            params![
                task.title.as_str(),
                task.description.as_deref(),
                days_json,
                task.interval_days,
                task.id,
            ],
        )?;

        warn_on_conflicting_pattern(task.id, task.days_of_week.as_deref(), task.interval_days);
        Ok(())
    }

    fn delete_repeating_task(&self, id: RepeatingTaskId) -> RepoResult<DeleteSummary> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::RepeatingTask, id)?;
        let summary = cascade::delete_repeating_task(&tx, id)?;
        tx.commit()?;
        Ok(summary)
    }

    fn add_check(
        &self,
        task_id: RepeatingTaskId,
        date: NaiveDate,
    ) -> RepoResult<RepeatingTaskCheck> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::RepeatingTask, task_id)?;
        tx.execute(
            "INSERT INTO repeating_task_checks (task_id, date) VALUES (?1, ?2);",
            params![task_id, date],
        )
        .map_err(|err| RepoError::from_write(EntityKind::RepeatingTaskCheck, err))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("event=habit_check module=repo status=ok task_id={task_id} date={date}");
        Ok(RepeatingTaskCheck { id, task_id, date })
    }

    fn remove_check(&self, task_id: RepeatingTaskId, date: NaiveDate) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::RepeatingTask, task_id)?;
        let removed = tx.execute(
            "DELETE FROM repeating_task_checks WHERE task_id = ?1 AND date = ?2;",
            params![task_id, date],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn toggle_check(&self, task_id: RepeatingTaskId, date: NaiveDate) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::RepeatingTask, task_id)?;
        let removed = tx.execute(
            "DELETE FROM repeating_task_checks WHERE task_id = ?1 AND date = ?2;",
            params![task_id, date],
        )?;
        if removed == 0 {
            tx.execute(
                "INSERT INTO repeating_task_checks (task_id, date) VALUES (?1, ?2);",
                params![task_id, date],
            )
            .map_err(|err| RepoError::from_write(EntityKind::RepeatingTaskCheck, err))?;
        }
        tx.commit()?;

        let checked = removed == 0;
        info!("event=habit_toggle module=repo status=ok task_id={task_id} date={date} checked={checked}");
        Ok(checked)
    }

    fn list_checks(
        &self,
        task_id: RepeatingTaskId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<RepeatingTaskCheck>> {
        ensure_exists(self.conn, EntityKind::RepeatingTask, task_id)?;
        self.collect_checks(
            "SELECT id, task_id, date
             FROM repeating_task_checks
             WHERE task_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC;",
            params![task_id, from, to],
        )
    }

    fn list_checks_on(
        &self,
        scope: RepeatingScope,
        date: NaiveDate,
    ) -> RepoResult<Vec<RepeatingTaskCheck>> {
        let (filter, id) = scope.filter_sql();
        self.collect_checks(
            &format!(
                "SELECT c.id AS id, c.task_id AS task_id, c.date AS date
                 FROM repeating_task_checks c
                 INNER JOIN repeating_tasks r ON r.id = c.task_id
                 WHERE {filter} AND c.date = ?2
                 ORDER BY c.task_id ASC;"
            ),
            params![id, date],
        )
    }
}

fn encode_weekdays(days: Option<&[u8]>) -> RepoResult<Option<String>> {
    days.map(|days| serde_json::to_string(days))
        .transpose()
        .map_err(|err| RepoError::InvalidData(format!("cannot encode days_of_week: {err}")))
}

fn decode_weekdays(id: RepeatingTaskId, raw: Option<String>) -> RepoResult<Option<Vec<u8>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let values: Vec<i64> = serde_json::from_str(&raw).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid days_of_week `{raw}` for repeating task {id}: {err}"
        ))
    })?;
    values
        .into_iter()
        .map(|value| {
            u8::try_from(value).map_err(|_| {
                RepoError::InvalidData(format!(
                    "weekday index {value} out of range for repeating task {id}"
                ))
            })
        })
        .collect::<RepoResult<Vec<u8>>>()
        .map(Some)
}

fn warn_on_conflicting_pattern(id: RepeatingTaskId, days: Option<&[u8]>, interval: Option<i64>) {
    if has_conflicting_pattern(days, interval) {
        warn!(
            "event=habit_pattern module=repo status=conflict task_id={id} detail=weekday_set_takes_precedence"
        );
    }
}

fn parse_repeating_row(row: &Row<'_>) -> RepoResult<RepeatingTask> {
    let id: RepeatingTaskId = row.get("id")?;
    let mut task = RepeatingTask {
        id,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        days_of_week: decode_weekdays(id, row.get("days_of_week")?)?,
        interval_days: row.get("interval_days")?,
    };
    task.normalize();
    task.validate()
        .map_err(|err| RepoError::InvalidData(format!("repeating task {id}: {err}")))?;
    Ok(task)
}
