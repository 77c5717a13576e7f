//! TaskStore port - source of truth for tasks.

use std::collections::HashSet;

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{NewTask, ProjectId, Task, TaskId, TaskState};

/// Sort order the store applies to eligible candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrder {
    /// Ascending id.
    IdAsc,
    /// Descending priority, then ascending id.
    PriorityDesc,
}

/// Query for tasks that may be served to one identity.
///
/// Implementations must return only tasks of `project_id` that are ongoing,
/// not broken, and whose id is not in `exclude`, sorted by `order`.
#[derive(Debug, Clone)]
pub struct EligibleQuery {
    pub project_id: ProjectId,
    pub exclude: HashSet<TaskId>,
    pub order: TaskOrder,
}

impl EligibleQuery {
    pub fn new(project_id: ProjectId, order: TaskOrder) -> Self {
        Self {
            project_id,
            exclude: HashSet::new(),
            order,
        }
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.exclude.extend(ids);
        self
    }

    /// Does `task` satisfy the query's filter (ordering aside)?
    pub fn matches(&self, task: &Task) -> bool {
        task.project_id == self.project_id
            && task.is_schedulable()
            && !self.exclude.contains(&task.id)
    }
}

/// TaskStore holds task records per project.
///
/// Mutations are single-record and atomic; there is no lock spanning calls.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn get(&self, task_id: TaskId) -> Result<Option<Task>, StoreError>;

    async fn eligible(&self, query: EligibleQuery) -> Result<Vec<Task>, StoreError>;

    /// Number of tasks in a project, regardless of state.
    async fn count(&self, project_id: ProjectId) -> Result<u64, StoreError>;

    async fn set_state(&self, task_id: TaskId, state: TaskState) -> Result<Task, StoreError>;

    async fn set_broken(&self, task_id: TaskId, is_broken: bool) -> Result<Task, StoreError>;

    async fn set_n_answers(&self, task_id: TaskId, n_answers: u32) -> Result<Task, StoreError>;

    /// Cascade delete; returns how many tasks were removed.
    async fn delete_project(&self, project_id: ProjectId) -> Result<u64, StoreError>;
}
