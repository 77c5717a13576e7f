//! AnswerStore port - recorded TaskRuns.

use std::collections::HashSet;

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{Identity, NewTaskRun, ProjectId, TaskId, TaskRun};

/// AnswerStore holds answers per task.
///
/// `insert` is the correctness boundary for "one answer per (task, identity)":
/// the uniqueness check and the insert must happen atomically, and a duplicate
/// must fail with `StoreError::DuplicateAnswer`.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    async fn insert(&self, run: NewTaskRun) -> Result<TaskRun, StoreError>;

    async fn count_by_task(&self, task_id: TaskId) -> Result<u64, StoreError>;

    /// Answers an identity has given within a project.
    async fn count_by_identity(
        &self,
        project_id: ProjectId,
        identity: &Identity,
    ) -> Result<u64, StoreError>;

    /// Tasks of a project an identity has already answered.
    async fn answered_tasks(
        &self,
        project_id: ProjectId,
        identity: &Identity,
    ) -> Result<HashSet<TaskId>, StoreError>;

    async fn list_by_task(&self, task_id: TaskId) -> Result<Vec<TaskRun>, StoreError>;

    /// Cascade delete; returns how many answers were removed.
    async fn delete_project(&self, project_id: ProjectId) -> Result<u64, StoreError>;
}
