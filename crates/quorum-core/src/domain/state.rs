//! Task lifecycle state.

use serde::{Deserialize, Serialize};

/// State of a task.
///
/// Transitions:
/// - Ongoing -> Completed (answer count reached `n_answers`, or closed manually)
/// - Completed -> Ongoing (redundancy target raised above the answer count)
///
/// Brokenness is a separate flag; a broken task keeps its state but is never served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Ongoing,
    Completed,
}

impl TaskState {
    pub fn is_open(self) -> bool {
        matches!(self, TaskState::Ongoing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Ongoing => "ongoing",
            TaskState::Completed => "completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_lowercase_names() {
        assert_eq!(serde_json::to_string(&TaskState::Ongoing).unwrap(), "\"ongoing\"");
        assert_eq!(serde_json::to_string(&TaskState::Completed).unwrap(), "\"completed\"");
    }

    #[test]
    fn new_tasks_start_ongoing() {
        assert_eq!(TaskState::default(), TaskState::Ongoing);
        assert!(TaskState::default().is_open());
    }
}
