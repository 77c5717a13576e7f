//! ProjectStore port - read access to project settings.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{Project, ProjectId};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, project_id: ProjectId) -> Result<Option<Project>, StoreError>;
}
