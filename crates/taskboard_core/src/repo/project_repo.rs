//! Project repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A project can only be created for an existing user.
//! - Deleting a project removes its tasks, tags, documents, repeating tasks,
//!   check-ins and association rows in the same transaction.

use crate::model::entity::{EntityKind, ProjectId, UserId};
use crate::model::project::{NewProject, Project};
use crate::repo::cascade::{self, DeleteSummary};
use crate::repo::{
    begin_write, ensure_connection_ready, ensure_exists, ensure_parent, update_row, RepoError,
    RepoResult,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    name,
    description,
    created_at
FROM projects";

pub trait ProjectRepository {
    fn create_project(&self, project: &NewProject) -> RepoResult<Project>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Lists a user's projects, newest first.
    fn list_projects(&self, user_id: UserId) -> RepoResult<Vec<Project>>;
    /// Updates name and description; ownership never changes.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<DeleteSummary>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        project.validate()?;

        let tx = begin_write(self.conn)?;
        ensure_parent(
            &tx,
            EntityKind::Project,
            "user_id",
            EntityKind::User,
            project.user_id,
        )?;
        tx.execute(
            "INSERT INTO projects (user_id, name, description, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                project.user_id,
                project.name.as_str(),
                project.description.as_deref(),
                project.created_at,
            ],
        )
        .map_err(|err| RepoError::from_write(EntityKind::Project, err))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(
            "event=project_create module=repo status=ok project_id={id} user_id={}",
            project.user_id
        );
        Ok(project.clone().into_project(id))
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let project = stmt
            .query_row([id], |row| Ok(parse_project_row(row)))
            .optional()?;
        project.transpose()
    }

    fn list_projects(&self, user_id: UserId) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        update_row(
            self.conn,
            EntityKind::Project,
            project.id,
            "UPDATE projects SET name = ?1, description = ?2 WHERE id = ?3;",
            params![
                project.name.as_str(),
                project.description.as_deref(),
                project.id
            ],
        )
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<DeleteSummary> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::Project, id)?;
        let summary = cascade::delete_project(&tx, id)?;
        tx.commit()?;

        info!(
            "event=project_delete module=repo status=ok project_id={id} tasks={} documents={} tags={} repeating_tasks={}",
            summary.tasks, summary.documents, summary.tags, summary.repeating_tasks
        );
        Ok(summary)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let project = Project {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    };
    project
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("project {}: {err}", project.id)))?;
    Ok(project)
}
