//! InMemoryProjectStore - project settings keyed by id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Project, ProjectId};
use crate::ports::{ProjectStore, StoreError};

#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project.
    pub async fn upsert(&self, project: Project) {
        self.projects.write().await.insert(project.id, project);
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get(&self, project_id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.projects.read().await.get(&project_id).cloned())
    }
}
