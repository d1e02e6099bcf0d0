//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist tasks and their priority/status lifecycle.
//! - Own the task↔document and task↔tag association tables.
//!
//! # Invariants
//! - An association pair appears at most once; linking twice is a no-op.
//! - Both sides of an association belong to the same project.
//! - `set_task_tags` replaces the whole tag set in a single transaction.

use crate::model::entity::{DocumentId, EntityKind, ProjectId, TagId, TaskId, ValidationError};
use crate::model::project::{Document, Tag};
use crate::model::task::{NewTask, Task, TaskPriority, TaskStatus};
use crate::repo::cascade::{self, DeleteSummary};
use crate::repo::document_repo::{parse_document_row, DOCUMENT_SELECT_SQL};
use crate::repo::tag_repo::{parse_tag_row, TAG_SELECT_SQL};
use crate::repo::{
    begin_write, ensure_connection_ready, ensure_exists, ensure_parent, update_row, RepoError,
    RepoResult,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    title,
    description,
    priority,
    status,
    deadline,
    created_at
FROM tasks";

/// Query options for listing a project's tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListQuery {
    pub project_id: ProjectId,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskListQuery {
    pub fn for_project(project_id: ProjectId) -> Self {
        Self {
            project_id,
            status: None,
            priority: None,
        }
    }
}

pub trait TaskRepository {
    fn create_task(&self, task: &NewTask) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Lists tasks newest first, optionally filtered by status/priority.
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Replaces every mutable field; the owning project never changes.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn delete_task(&self, id: TaskId) -> RepoResult<DeleteSummary>;

    /// Links a document; returns `false` when the pair already existed.
    fn link_document(&self, task_id: TaskId, document_id: DocumentId) -> RepoResult<bool>;
    /// Unlinks a document; returns `false` when the pair did not exist.
    fn unlink_document(&self, task_id: TaskId, document_id: DocumentId) -> RepoResult<bool>;
    /// Links a tag; returns `false` when the pair already existed.
    fn link_tag(&self, task_id: TaskId, tag_id: TagId) -> RepoResult<bool>;
    /// Unlinks a tag; returns `false` when the pair did not exist.
    fn unlink_tag(&self, task_id: TaskId, tag_id: TagId) -> RepoResult<bool>;
    /// Replaces all tags of a task in one transaction.
    fn set_task_tags(&self, task_id: TaskId, tag_ids: &[TagId]) -> RepoResult<()>;

    fn list_task_documents(&self, task_id: TaskId) -> RepoResult<Vec<Document>>;
    fn list_task_tags(&self, task_id: TaskId) -> RepoResult<Vec<Tag>>;
    fn list_tasks_with_document(&self, document_id: DocumentId) -> RepoResult<Vec<Task>>;
    fn list_tasks_with_tag(&self, tag_id: TagId) -> RepoResult<Vec<Task>>;
}

pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_tasks(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &NewTask) -> RepoResult<Task> {
        task.validate()?;

        let tx = begin_write(self.conn)?;
        ensure_parent(
            &tx,
            EntityKind::Task,
            "project_id",
            EntityKind::Project,
            task.project_id,
        )?;
        tx.execute(
            "INSERT INTO tasks (
                project_id,
                title,
                description,
                priority,
                status,
                deadline,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                task.project_id,
                task.title.as_str(),
                task.description.as_deref(),
                task.priority.as_str(),
                task.status.as_str(),
                task.deadline,
                task.created_at,
            ],
        )
        .map_err(|err| RepoError::from_write(EntityKind::Task, err))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(task.clone().into_task(id))
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let task = stmt
            .query_row([id], |row| Ok(parse_task_row(row)))
            .optional()?;
        task.transpose()
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE project_id = ?");
        let mut bind_values = vec![Value::Integer(query.project_id)];

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(priority) = query.priority {
            sql.push_str(" AND priority = ?");
            bind_values.push(Value::Text(priority.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC;");

        self.query_tasks(&sql, bind_values)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        update_row(
            self.conn,
            EntityKind::Task,
            task.id,
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                priority = ?3,
                status = ?4,
                deadline = ?5
             WHERE id = ?6;",
            params![
                task.title.as_str(),
                task.description.as_deref(),
                task.priority.as_str(),
                task.status.as_str(),
                task.deadline,
                task.id,
            ],
        )
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<DeleteSummary> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::Task, id)?;
        let summary = cascade::delete_task(&tx, id)?;
        tx.commit()?;
        Ok(summary)
    }

    fn link_document(&self, task_id: TaskId, document_id: DocumentId) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        ensure_same_project(&tx, task_id, EntityKind::Document, document_id)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO task_documents (task_id, document_id) VALUES (?1, ?2);",
            params![task_id, document_id],
        )?;
        tx.commit()?;

        debug!(
            "event=task_link module=repo status=ok task_id={task_id} document_id={document_id} inserted={}",
            inserted > 0
        );
        Ok(inserted > 0)
    }

    fn unlink_document(&self, task_id: TaskId, document_id: DocumentId) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::Task, task_id)?;
        ensure_exists(&tx, EntityKind::Document, document_id)?;
        let removed = tx.execute(
            "DELETE FROM task_documents WHERE task_id = ?1 AND document_id = ?2;",
            params![task_id, document_id],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn link_tag(&self, task_id: TaskId, tag_id: TagId) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        ensure_same_project(&tx, task_id, EntityKind::Tag, tag_id)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES (?1, ?2);",
            params![task_id, tag_id],
        )?;
        tx.commit()?;

        debug!(
            "event=task_link module=repo status=ok task_id={task_id} tag_id={tag_id} inserted={}",
            inserted > 0
        );
        Ok(inserted > 0)
    }

    fn unlink_tag(&self, task_id: TaskId, tag_id: TagId) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::Task, task_id)?;
        ensure_exists(&tx, EntityKind::Tag, tag_id)?;
        let removed = tx.execute(
            "DELETE FROM task_tags WHERE task_id = ?1 AND tag_id = ?2;",
            params![task_id, tag_id],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn set_task_tags(&self, task_id: TaskId, tag_ids: &[TagId]) -> RepoResult<()> {
        let unique: BTreeSet<TagId> = tag_ids.iter().copied().collect();

        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::Task, task_id)?;
        for tag_id in &unique {
            ensure_same_project(&tx, task_id, EntityKind::Tag, *tag_id)?;
        }

        tx.execute("DELETE FROM task_tags WHERE task_id = ?1;", [task_id])?;
        for tag_id in &unique {
            tx.execute(
                "INSERT INTO task_tags (task_id, tag_id) VALUES (?1, ?2);",
                params![task_id, tag_id],
            )
            .map_err(|err| RepoError::from_write(EntityKind::Task, err))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_task_documents(&self, task_id: TaskId) -> RepoResult<Vec<Document>> {
        ensure_exists(self.conn, EntityKind::Task, task_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE id IN (SELECT document_id FROM task_documents WHERE task_id = ?1)
             ORDER BY created_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([task_id])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn list_task_tags(&self, task_id: TaskId) -> RepoResult<Vec<Tag>> {
        ensure_exists(self.conn, EntityKind::Task, task_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "{TAG_SELECT_SQL}
             WHERE id IN (SELECT tag_id FROM task_tags WHERE task_id = ?1)
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([task_id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn list_tasks_with_document(&self, document_id: DocumentId) -> RepoResult<Vec<Task>> {
        ensure_exists(self.conn, EntityKind::Document, document_id)?;
        self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE id IN (SELECT task_id FROM task_documents WHERE document_id = ?)
                 ORDER BY created_at DESC, id DESC;"
            ),
            vec![Value::Integer(document_id)],
        )
    }

    fn list_tasks_with_tag(&self, tag_id: TagId) -> RepoResult<Vec<Task>> {
        ensure_exists(self.conn, EntityKind::Tag, tag_id)?;
        self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE id IN (SELECT task_id FROM task_tags WHERE tag_id = ?)
                 ORDER BY created_at DESC, id DESC;"
            ),
            vec![Value::Integer(tag_id)],
        )
    }
}

/// Checks both rows exist and share a project.
fn ensure_same_project(
    conn: &Connection,
    task_id: TaskId,
    other: EntityKind,
    other_id: i64,
) -> RepoResult<()> {
    let task_project = project_of(conn, EntityKind::Task, task_id)?;
    let other_project = project_of(conn, other, other_id)?;
    if task_project != other_project {
        return Err(ValidationError::new(
            EntityKind::Task,
            match other {
                EntityKind::Tag => "tags",
                _ => "documents",
            },
            format!("{other} {other_id} belongs to a different project"),
        )
        .into());
    }
    Ok(())
}

fn project_of(conn: &Connection, entity: EntityKind, id: i64) -> RepoResult<ProjectId> {
    conn.query_row(
        &format!("SELECT project_id FROM {} WHERE id = ?1;", entity.table()),
        [id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(RepoError::NotFound { entity, id })
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: TaskId = row.get("id")?;
    let priority_text: String = row.get("priority")?;
    let priority = priority_text.parse::<TaskPriority>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;
    let status_text: String = row.get("status")?;
    let status = status_text.parse::<TaskStatus>().map_err(|_| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let task = Task {
        id,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
        status,
        deadline: row.get("deadline")?,
        created_at: row.get("created_at")?,
    };
    task.validate()
        .map_err(|err| RepoError::InvalidData(format!("task {id}: {err}")))?;
    Ok(task)
}
