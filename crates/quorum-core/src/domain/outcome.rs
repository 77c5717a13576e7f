//! Assignment: the three-way result of asking for a new task.
//!
//! "No task available" and "not allowed to contribute" are ordinary outcomes,
//! not errors; callers render each differently. Failures travel separately as
//! `QuorumError`.

use serde::Serialize;

use super::task::Task;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "task", rename_all = "snake_case")]
pub enum Assignment {
    /// A task the identity has not answered and does not currently hold.
    Task(Task),

    /// The project does not accept this kind of identity (anonymous).
    Forbidden,

    /// Nothing left for this identity under the requested policy/offset.
    Empty,
}

impl Assignment {
    pub fn task(&self) -> Option<&Task> {
        match self {
            Assignment::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn into_task(self) -> Option<Task> {
        match self {
            Assignment::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Assignment::Forbidden)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Assignment::Empty)
    }
}

impl From<Option<Task>> for Assignment {
    fn from(task: Option<Task>) -> Self {
        task.map_or(Assignment::Empty, Assignment::Task)
    }
}
