//! Project and project-owned content records (tags, documents).
//!
//! # Invariants
//! - Every tag and document belongs to exactly one project.
//! - Deleting a project deletes its tags and documents.

use crate::model::entity::{
    require_text, utc_now, DocumentId, EntityKind, ProjectId, TagId, UserId,
    ValidationError,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const PROJECT_NAME_MAX_CHARS: usize = 100;
pub const TAG_NAME_MAX_CHARS: usize = 50;
pub const DOCUMENT_TITLE_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

impl NewProject {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            description: None,
            created_at: utc_now(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_project_name(&self.name)
    }

    pub(crate) fn into_project(self, id: ProjectId) -> Project {
        Project {
            id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

impl Project {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_project_name(&self.name)
    }
}

fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    require_text(EntityKind::Project, "name", name, PROJECT_NAME_MAX_CHARS)
}

/// Project-scoped label attachable to tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub project_id: ProjectId,
    pub name: String,
}

impl Tag {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tag_name(&self.name)
    }
}

pub(crate) fn validate_tag_name(name: &str) -> Result<(), ValidationError> {
    require_text(EntityKind::Tag, "name", name, TAG_NAME_MAX_CHARS)
}

/// Text document stored alongside a project's tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub title: String,
    pub content: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub project_id: ProjectId,
    pub title: String,
    pub content: Option<String>,
    pub created_at: NaiveDateTime,
}

impl NewDocument {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            content: None,
            created_at: utc_now(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_document_title(&self.title)
    }

    pub(crate) fn into_document(self, id: DocumentId) -> Document {
        Document {
            id,
            project_id: self.project_id,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

impl Document {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_document_title(&self.title)
    }
}

fn validate_document_title(title: &str) -> Result<(), ValidationError> {
    require_text(
        EntityKind::Document,
        "title",
        title,
        DOCUMENT_TITLE_MAX_CHARS,
    )
}
