//! Domain service over the record access layer
//!
//! Passes data through unchanged. The only thing it adds is turning an absent
//! row or a zero-row write into [`ServiceError::NotFound`], and refusing to
//! modify a project that was never saved ([`ServiceError::Unsaved`]).

use crate::db::{Database, DbError};
use crate::model::Project;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Project with ID={project_id} does not exist.")]
    NotFound { project_id: i32 },
    #[error("Project has not been saved yet, so there is nothing to modify.")]
    Unsaved,
    #[error(transparent)]
    Db(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

pub struct ProjectService {
    db: Database,
}

impl ProjectService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Underlying store, for callers that need child-record writes
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn add_project(&self, project: &Project) -> Result<Project> {
        Ok(self.db.insert_project(project)?)
    }

    /// Project with materials, steps and categories
    pub fn fetch_project_by_id(&self, project_id: i32) -> Result<Project> {
        tracing::debug!(project_id, "fetching project");
        self.db
            .fetch_project_by_id(project_id)?
            .ok_or(ServiceError::NotFound { project_id })
    }

    /// Summary listing; child collections are not loaded
    pub fn fetch_all_projects(&self) -> Result<Vec<Project>> {
        Ok(self.db.fetch_all_projects()?)
    }

    pub fn modify_project_details(&self, project: &Project) -> Result<()> {
        let Some(project_id) = project.project_id else {
            return Err(ServiceError::Unsaved);
        };
        if self.db.modify_project_details(project)?.is_applied() {
            Ok(())
        } else {
            Err(ServiceError::NotFound { project_id })
        }
    }

    pub fn delete_project(&self, project_id: i32) -> Result<()> {
        if self.db.delete_project(project_id)?.is_applied() {
            Ok(())
        } else {
            Err(ServiceError::NotFound { project_id })
        }
    }
}
