//! StoreError - failures reported by store implementations.

use crate::domain::{Identity, QuorumError, TaskId};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or failed internally.
    #[error("{0}")]
    Unavailable(String),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// Uniqueness of (task, identity) answers was violated.
    #[error("duplicate answer for {task_id} by {identity}")]
    DuplicateAnswer { task_id: TaskId, identity: Identity },
}

impl From<StoreError> for QuorumError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => QuorumError::Unavailable(msg),
            StoreError::TaskNotFound(id) => QuorumError::TaskNotFound(id),
            StoreError::DuplicateAnswer { task_id, identity } => {
                QuorumError::Conflict { task_id, identity }
            }
        }
    }
}
