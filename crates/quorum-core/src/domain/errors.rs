//! Errors and their operational classification.

use super::identity::Identity;
use super::ids::{ProjectId, TaskId};

/// Operational classification of a failure.
///
/// - Permanent: retrying the same request cannot succeed.
/// - Transient: a backing store was unreachable or too slow; retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Permanent,
    Transient,
}

#[derive(Debug, thiserror::Error)]
pub enum QuorumError {
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("{identity} may not contribute to {project_id}")]
    Forbidden {
        project_id: ProjectId,
        identity: Identity,
    },

    #[error("{identity} already answered {task_id}")]
    Conflict { task_id: TaskId, identity: Identity },

    #[error("{0} is completed or broken and accepts no more answers")]
    TaskClosed(TaskId),

    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("config error: {0}")]
    Config(String),
}

impl QuorumError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuorumError::Unavailable(_) => ErrorKind::Transient,
            _ => ErrorKind::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QuorumError::ProjectNotFound(_) | QuorumError::TaskNotFound(_)
        )
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, QuorumError>;
