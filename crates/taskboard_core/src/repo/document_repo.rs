//! Document repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Documents are scoped to one project.
//! - Deleting a document unlinks it from every task first.

use crate::model::entity::{DocumentId, EntityKind, ProjectId};
use crate::model::project::{Document, NewDocument};
use crate::repo::cascade::{self, DeleteSummary};
use crate::repo::{
    begin_write, ensure_connection_ready, ensure_exists, ensure_parent, update_row, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    title,
    content,
    created_at
FROM documents";

pub trait DocumentRepository {
    fn create_document(&self, document: &NewDocument) -> RepoResult<Document>;
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    /// Lists a project's documents, newest first.
    fn list_documents(&self, project_id: ProjectId) -> RepoResult<Vec<Document>>;
    /// Replaces title and content.
    fn update_document(&self, document: &Document) -> RepoResult<()>;
    fn delete_document(&self, id: DocumentId) -> RepoResult<DeleteSummary>;
}

pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(&self, document: &NewDocument) -> RepoResult<Document> {
        document.validate()?;

        let tx = begin_write(self.conn)?;
        ensure_parent(
            &tx,
            EntityKind::Document,
            "project_id",
            EntityKind::Project,
            document.project_id,
        )?;
        tx.execute(
            "INSERT INTO documents (project_id, title, content, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                document.project_id,
                document.title.as_str(),
                document.content.as_deref(),
                document.created_at,
            ],
        )
        .map_err(|err| RepoError::from_write(EntityKind::Document, err))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(document.clone().into_document(id))
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let document = stmt
            .query_row([id], |row| Ok(parse_document_row(row)))
            .optional()?;
        document.transpose()
    }

    fn list_documents(&self, project_id: ProjectId) -> RepoResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE project_id = ?1
             ORDER BY created_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn update_document(&self, document: &Document) -> RepoResult<()> {
        document.validate()?;

        update_row(
            self.conn,
            EntityKind::Document,
            document.id,
            "UPDATE documents SET title = ?1, content = ?2 WHERE id = ?3;",
            params![
                document.title.as_str(),
                document.content.as_deref(),
                document.id
            ],
        )
    }

    fn delete_document(&self, id: DocumentId) -> RepoResult<DeleteSummary> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::Document, id)?;
        let summary = cascade::delete_document(&tx, id)?;
        tx.commit()?;
        Ok(summary)
    }
}

pub(crate) fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let document = Document {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    };
    document
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("document {}: {err}", document.id)))?;
    Ok(document)
}
