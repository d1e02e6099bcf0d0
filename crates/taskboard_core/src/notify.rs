//! Reminder collection boundary for the chat-bot channel.
//!
//! # Responsibility
//! - Build one reminder per notifiable user from due, unchecked repeating
//!   tasks.
//! - Feed reminders to a caller-provided transport and report outcomes.
//!
//! # Invariants
//! - Only users with notifications enabled and a linked chat are reminded.
//! - Users with nothing pending get no reminder.
//! - A failed delivery never stops delivery to the remaining users.
//! - Transport and scheduling cadence live outside core.

use crate::model::entity::UserId;
use crate::model::repeating::RepeatingTask;
use crate::repo::repeating_repo::{RepeatingScope, RepeatingTaskRepository};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoResult;
use crate::service::habit_service::due_and_unchecked_in;
use chrono::NaiveDate;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Pending repeating tasks for one user on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub user_id: UserId,
    pub chat_id: String,
    pub date: NaiveDate,
    pub tasks: Vec<RepeatingTask>,
}

impl Reminder {
    /// Plain-text body listing pending task titles.
    pub fn render_text(&self) -> String {
        let mut body = format!("Reminders for {}:", self.date.format("%Y-%m-%d"));
        for task in &self.tasks {
            body.push_str("\n- ");
            body.push_str(&task.title);
        }
        body
    }
}

/// Transport failure reported by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "reminder delivery failed: {}", self.message)
    }
}

impl Error for DispatchError {}

/// Delivers reminders to a chat transport.
pub trait ReminderDispatcher {
    fn deliver(&mut self, reminder: &Reminder) -> Result<(), DispatchError>;
}

/// Outcome counts of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Builds reminders for every notifiable user with pending tasks on `date`.
pub fn collect_reminders<U: UserRepository, R: RepeatingTaskRepository>(
    users: &U,
    habits: &R,
    date: NaiveDate,
) -> RepoResult<Vec<Reminder>> {
    let mut reminders = Vec::new();
    for user in users.list_reminder_recipients()? {
        let Some(chat_id) = user.reminder_chat_id() else {
            continue;
        };
        let tasks = due_and_unchecked_in(habits, RepeatingScope::User(user.id), date)?;
        if tasks.is_empty() {
            continue;
        }
        reminders.push(Reminder {
            user_id: user.id,
            chat_id: chat_id.to_string(),
            date,
            tasks,
        });
    }
    Ok(reminders)
}

/// Collects reminders for `date` and hands each to `dispatcher`.
pub fn dispatch_reminders<U, R, D>(
    users: &U,
    habits: &R,
    dispatcher: &mut D,
    date: NaiveDate,
) -> RepoResult<DispatchReport>
where
    U: UserRepository,
    R: RepeatingTaskRepository,
    D: ReminderDispatcher + ?Sized,
{
    let started_at = Instant::now();
    let reminders = collect_reminders(users, habits, date)?;

    let mut report = DispatchReport::default();
    for reminder in &reminders {
        match dispatcher.deliver(reminder) {
            Ok(()) => report.sent += 1,
            Err(err) => {
                report.failed += 1;
                error!(
                    "event=reminder_send module=notify status=error user_id={} tasks={} error={err}",
                    reminder.user_id,
                    reminder.tasks.len()
                );
            }
        }
    }

    info!(
        "event=reminder_dispatch module=notify status=ok date={date} sent={} failed={} duration_ms={}",
        report.sent,
        report.failed,
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::Reminder;
    use crate::model::repeating::NewRepeatingTask;
    use chrono::NaiveDate;

    #[test]
    fn render_text_lists_titles_in_order() {
        let reminder = Reminder {
            user_id: 1,
            chat_id: "100".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            tasks: vec![
                NewRepeatingTask::new(1, "Stretch").into_task(1),
                NewRepeatingTask::new(1, "Read").into_task(2),
            ],
        };
        assert_eq!(
            reminder.render_text(),
            "Reminders for 2024-06-03:\n- Stretch\n- Read"
        );
    }
}
