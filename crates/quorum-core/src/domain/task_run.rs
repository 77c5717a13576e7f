//! TaskRun: one identity's answer to one task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Identity;
use super::ids::{ProjectId, TaskId, TaskRunId};

/// A recorded answer. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
    pub id: TaskRunId,
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub identity: Identity,
    pub info: serde_json::Value,
    pub created: DateTime<Utc>,
}

/// Input for inserting an answer. The store assigns `id` and `created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskRun {
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub identity: Identity,
    pub info: serde_json::Value,
}

impl NewTaskRun {
    pub fn into_task_run(self, id: TaskRunId, created: DateTime<Utc>) -> TaskRun {
        TaskRun {
            id,
            task_id: self.task_id,
            project_id: self.project_id,
            identity: self.identity,
            info: self.info,
            created,
        }
    }
}
