//! Project use-case service.
//!
//! # Invariants
//! - Project reads on behalf of a user only return projects that user owns.

use crate::model::entity::{EntityKind, ProjectId, UserId};
use crate::model::project::{NewProject, Project};
use crate::repo::cascade::DeleteSummary;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::normalize_optional;

pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_project(
        &self,
        user_id: UserId,
        name: &str,
        description: Option<String>,
    ) -> RepoResult<Project> {
        let mut project = NewProject::new(user_id, name.trim());
        project.description = normalize_optional(description);
        self.repo.create_project(&project)
    }

    /// Loads a project owned by `user_id`.
    ///
    /// A project owned by someone else is reported as `NotFound` so callers
    /// cannot probe foreign ids.
    pub fn get_owned_project(&self, user_id: UserId, id: ProjectId) -> RepoResult<Project> {
        self.repo
            .get_project(id)?
            .filter(|project| project.user_id == user_id)
            .ok_or(RepoError::NotFound {
                entity: EntityKind::Project,
                id,
            })
    }

    pub fn list_projects(&self, user_id: UserId) -> RepoResult<Vec<Project>> {
        self.repo.list_projects(user_id)
    }

    pub fn update_project(
        &self,
        user_id: UserId,
        id: ProjectId,
        name: &str,
        description: Option<String>,
    ) -> RepoResult<Project> {
        let mut project = self.get_owned_project(user_id, id)?;
        project.name = name.trim().to_string();
        project.description = normalize_optional(description);
        self.repo.update_project(&project)?;
        Ok(project)
    }

    /// Deletes a project with all tasks, tags, documents and repeating tasks.
    pub fn delete_project(&self, user_id: UserId, id: ProjectId) -> RepoResult<DeleteSummary> {
        self.get_owned_project(user_id, id)?;
        self.repo.delete_project(id)
    }
}
