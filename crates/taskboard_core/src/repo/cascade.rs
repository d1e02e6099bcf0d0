//! Explicit cascade-delete routines.
//!
//! # Responsibility
//! - Remove an entity and everything it owns, children before parents.
//!
//! # Invariants
//! - Callers run these inside one write transaction; partial cascades never
//!   commit.
//! - Association rows are removed before either side of the pair.
//! - The schema declares no `ON DELETE CASCADE`; a missed child fails the
//!   parent delete with a foreign key error.

use crate::model::entity::{
    DocumentId, EntityKind, ProjectId, RepeatingTaskId, TagId, TaskId, UserId,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use serde::Serialize;
use std::ops::AddAssign;

/// Row counts removed by one delete operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub users: usize,
    pub projects: usize,
    pub tasks: usize,
    pub tags: usize,
    pub documents: usize,
    pub repeating_tasks: usize,
    pub repeating_task_checks: usize,
    pub task_document_links: usize,
    pub task_tag_links: usize,
}

impl DeleteSummary {
    pub fn total(&self) -> usize {
        self.users
            + self.projects
            + self.tasks
            + self.tags
            + self.documents
            + self.repeating_tasks
            + self.repeating_task_checks
            + self.task_document_links
            + self.task_tag_links
    }
}

impl AddAssign for DeleteSummary {
    fn add_assign(&mut self, other: Self) {
        self.users += other.users;
        self.projects += other.projects;
        self.tasks += other.tasks;
        self.tags += other.tags;
        self.documents += other.documents;
        self.repeating_tasks += other.repeating_tasks;
        self.repeating_task_checks += other.repeating_task_checks;
        self.task_document_links += other.task_document_links;
        self.task_tag_links += other.task_tag_links;
    }
}

pub(crate) fn delete_task(conn: &Connection, task_id: TaskId) -> RepoResult<DeleteSummary> {
    let mut summary = DeleteSummary {
        task_document_links: conn
            .execute("DELETE FROM task_documents WHERE task_id = ?1;", [task_id])?,
        task_tag_links: conn.execute("DELETE FROM task_tags WHERE task_id = ?1;", [task_id])?,
        ..DeleteSummary::default()
    };
    summary.tasks = delete_row(conn, EntityKind::Task, task_id)?;
    Ok(summary)
}

pub(crate) fn delete_tag(conn: &Connection, tag_id: TagId) -> RepoResult<DeleteSummary> {
    let mut summary = DeleteSummary {
        task_tag_links: conn.execute("DELETE FROM task_tags WHERE tag_id = ?1;", [tag_id])?,
        ..DeleteSummary::default()
    };
    summary.tags = delete_row(conn, EntityKind::Tag, tag_id)?;
    Ok(summary)
}

pub(crate) fn delete_document(
    conn: &Connection,
    document_id: DocumentId,
) -> RepoResult<DeleteSummary> {
    let mut summary = DeleteSummary {
        task_document_links: conn.execute(
            "DELETE FROM task_documents WHERE document_id = ?1;",
            [document_id],
        )?,
        ..DeleteSummary::default()
    };
    summary.documents = delete_row(conn, EntityKind::Document, document_id)?;
    Ok(summary)
}

pub(crate) fn delete_repeating_task(
    conn: &Connection,
    task_id: RepeatingTaskId,
) -> RepoResult<DeleteSummary> {
    let mut summary = DeleteSummary {
        repeating_task_checks: conn.execute(
            "DELETE FROM repeating_task_checks WHERE task_id = ?1;",
            [task_id],
        )?,
        ..DeleteSummary::default()
    };
    summary.repeating_tasks = delete_row(conn, EntityKind::RepeatingTask, task_id)?;
    Ok(summary)
}

pub(crate) fn delete_project(
    conn: &Connection,
    project_id: ProjectId,
) -> RepoResult<DeleteSummary> {
    let mut summary = DeleteSummary {
        task_document_links: conn.execute(
            "DELETE FROM task_documents
             WHERE task_id IN (SELECT id FROM tasks WHERE project_id = ?1)
                OR document_id IN (SELECT id FROM documents WHERE project_id = ?1);",
            [project_id],
        )?,
        task_tag_links: conn.execute(
            "DELETE FROM task_tags
             WHERE task_id IN (SELECT id FROM tasks WHERE project_id = ?1)
                OR tag_id IN (SELECT id FROM tags WHERE project_id = ?1);",
            [project_id],
        )?,
        repeating_task_checks: conn.execute(
            "DELETE FROM repeating_task_checks
             WHERE task_id IN (SELECT id FROM repeating_tasks WHERE project_id = ?1);",
            [project_id],
        )?,
        ..DeleteSummary::default()
    };

    summary.tasks = conn.execute("DELETE FROM tasks WHERE project_id = ?1;", [project_id])?;
    summary.tags = conn.execute("DELETE FROM tags WHERE project_id = ?1;", [project_id])?;
    summary.documents =
        conn.execute("DELETE FROM documents WHERE project_id = ?1;", [project_id])?;
    summary.repeating_tasks = conn.execute(
        "DELETE FROM repeating_tasks WHERE project_id = ?1;",
        [project_id],
    )?;
    summary.projects = delete_row(conn, EntityKind::Project, project_id)?;
    Ok(summary)
}

pub(crate) fn delete_user(conn: &Connection, user_id: UserId) -> RepoResult<DeleteSummary> {
    let mut stmt = conn.prepare("SELECT id FROM projects WHERE user_id = ?1 ORDER BY id;")?;
    let project_ids = stmt
        .query_map([user_id], |row| row.get::<_, ProjectId>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    let mut summary = DeleteSummary::default();
    for project_id in project_ids {
        summary += delete_project(conn, project_id)?;
    }
    summary.users = delete_row(conn, EntityKind::User, user_id)?;
    Ok(summary)
}

fn delete_row(conn: &Connection, entity: EntityKind, id: i64) -> RepoResult<usize> {
    let removed = conn
        .execute(
            &format!("DELETE FROM {} WHERE id = ?1;", entity.table()),
            [id],
        )
        .map_err(|err| RepoError::from_write(entity, err))?;
    if removed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(removed)
}
