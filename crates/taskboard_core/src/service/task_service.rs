//! Task use-case service.
//!
//! # Responsibility
//! - Turn form input (free-text priority/status) into validated tasks.
//! - Provide board moves and tag/document association entry points.
//!
//! # Invariants
//! - Missing priority/status fall back to `medium`/`backlog`.
//! - Unknown priority/status values fail with a validation error.

use crate::model::entity::{DocumentId, EntityKind, ProjectId, TagId, TaskId};
use crate::model::project::{Document, Tag};
use crate::model::task::{NewTask, Task, TaskPriority, TaskStatus};
use crate::repo::cascade::DeleteSummary;
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::normalize_optional;
use chrono::NaiveDate;

/// Task fields as submitted by a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<NaiveDate>,
}

impl TaskForm {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn parsed_priority(&self) -> RepoResult<TaskPriority> {
        match normalize_optional(self.priority.clone()) {
            Some(value) => Ok(value.parse()?),
            None => Ok(TaskPriority::default()),
        }
    }

    fn parsed_status(&self) -> RepoResult<TaskStatus> {
        match normalize_optional(self.status.clone()) {
            Some(value) => Ok(value.parse()?),
            None => Ok(TaskStatus::default()),
        }
    }
}

pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_task(&self, project_id: ProjectId, form: &TaskForm) -> RepoResult<Task> {
        let mut task = NewTask::new(project_id, form.title.trim());
        task.description = normalize_optional(form.description.clone());
        task.priority = form.parsed_priority()?;
        task.status = form.parsed_status()?;
        task.deadline = form.deadline;
        self.repo.create_task(&task)
    }

    pub fn get_task(&self, id: TaskId) -> RepoResult<Task> {
        self.repo.get_task(id)?.ok_or(RepoError::NotFound {
            entity: EntityKind::Task,
            id,
        })
    }

    pub fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        self.repo.list_tasks(query)
    }

    /// Replaces all editable fields from the form.
    pub fn update_task(&self, id: TaskId, form: &TaskForm) -> RepoResult<Task> {
        let mut task = self.get_task(id)?;
        task.title = form.title.trim().to_string();
        task.description = normalize_optional(form.description.clone());
        task.priority = form.parsed_priority()?;
        task.status = form.parsed_status()?;
        task.deadline = form.deadline;
        self.repo.update_task(&task)?;
        Ok(task)
    }

    /// Moves a task to another board column.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<Task> {
        let mut task = self.get_task(id)?;
        if task.status != status {
            task.status = status;
            self.repo.update_task(&task)?;
        }
        Ok(task)
    }

    /// Lists unfinished tasks whose deadline is before `today`, earliest first.
    pub fn overdue_tasks(&self, project_id: ProjectId, today: NaiveDate) -> RepoResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .repo
            .list_tasks(&TaskListQuery::for_project(project_id))?
            .into_iter()
            .filter(|task| task.is_overdue(today))
            .collect();
        tasks.sort_by_key(|task| (task.deadline, task.id));
        Ok(tasks)
    }

    pub fn delete_task(&self, id: TaskId) -> RepoResult<DeleteSummary> {
        self.repo.delete_task(id)
    }

    pub fn link_document(&self, task_id: TaskId, document_id: DocumentId) -> RepoResult<bool> {
        self.repo.link_document(task_id, document_id)
    }

    pub fn unlink_document(&self, task_id: TaskId, document_id: DocumentId) -> RepoResult<bool> {
        self.repo.unlink_document(task_id, document_id)
    }

    pub fn link_tag(&self, task_id: TaskId, tag_id: TagId) -> RepoResult<bool> {
        self.repo.link_tag(task_id, tag_id)
    }

    pub fn unlink_tag(&self, task_id: TaskId, tag_id: TagId) -> RepoResult<bool> {
        self.repo.unlink_tag(task_id, tag_id)
    }

    /// Replaces the task's tag set and returns the tags now attached.
    pub fn set_tags(&self, task_id: TaskId, tag_ids: &[TagId]) -> RepoResult<Vec<Tag>> {
        self.repo.set_task_tags(task_id, tag_ids)?;
        self.repo.list_task_tags(task_id)
    }

    pub fn task_tags(&self, task_id: TaskId) -> RepoResult<Vec<Tag>> {
        self.repo.list_task_tags(task_id)
    }

    pub fn task_documents(&self, task_id: TaskId) -> RepoResult<Vec<Document>> {
        self.repo.list_task_documents(task_id)
    }

    pub fn tasks_with_tag(&self, tag_id: TagId) -> RepoResult<Vec<Task>> {
        self.repo.list_tasks_with_tag(tag_id)
    }

    pub fn tasks_with_document(&self, document_id: DocumentId) -> RepoResult<Vec<Task>> {
        self.repo.list_tasks_with_document(document_id)
    }
}
