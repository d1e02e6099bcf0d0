//! Tag repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Tags are scoped to one project.
//! - Deleting a tag unlinks it from every task first.

use crate::model::entity::{EntityKind, ProjectId, TagId};
use crate::model::project::{validate_tag_name, Tag};
use crate::repo::cascade::{self, DeleteSummary};
use crate::repo::{
    begin_write, ensure_connection_ready, ensure_exists, ensure_parent, update_row, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const TAG_SELECT_SQL: &str = "SELECT id, project_id, name FROM tags";

pub trait TagRepository {
    fn create_tag(&self, project_id: ProjectId, name: &str) -> RepoResult<Tag>;
    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>>;
    /// Lists a project's tags sorted by name.
    fn list_tags(&self, project_id: ProjectId) -> RepoResult<Vec<Tag>>;
    fn rename_tag(&self, id: TagId, name: &str) -> RepoResult<()>;
    fn delete_tag(&self, id: TagId) -> RepoResult<DeleteSummary>;
}

pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, project_id: ProjectId, name: &str) -> RepoResult<Tag> {
        let name = name.trim();
        validate_tag_name(name)?;

        let tx = begin_write(self.conn)?;
        ensure_parent(
            &tx,
            EntityKind::Tag,
            "project_id",
            EntityKind::Project,
            project_id,
        )?;
        tx.execute(
            "INSERT INTO tags (project_id, name) VALUES (?1, ?2);",
            params![project_id, name],
        )
        .map_err(|err| RepoError::from_write(EntityKind::Tag, err))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Tag {
            id,
            project_id,
            name: name.to_string(),
        })
    }

    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TAG_SELECT_SQL} WHERE id = ?1;"))?;
        let tag = stmt
            .query_row([id], |row| Ok(parse_tag_row(row)))
            .optional()?;
        tag.transpose()
    }

    fn list_tags(&self, project_id: ProjectId) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TAG_SELECT_SQL}
             WHERE project_id = ?1
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn rename_tag(&self, id: TagId, name: &str) -> RepoResult<()> {
        let name = name.trim();
        validate_tag_name(name)?;

        update_row(
            self.conn,
            EntityKind::Tag,
            id,
            "UPDATE tags SET name = ?1 WHERE id = ?2;",
            params![name, id],
        )
    }

    fn delete_tag(&self, id: TagId) -> RepoResult<DeleteSummary> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::Tag, id)?;
        let summary = cascade::delete_tag(&tx, id)?;
        tx.commit()?;
        Ok(summary)
    }
}

pub(crate) fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let tag = Tag {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
    };
    tag.validate()
        .map_err(|err| RepoError::InvalidData(format!("tag {}: {err}", tag.id)))?;
    Ok(tag)
}
