//! Task record and its creation input.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ProjectId, TaskId};
use super::state::TaskState;

/// Redundancy used when a task is created without an explicit target.
pub const DEFAULT_N_ANSWERS: u32 = 5;

/// A unit of work that needs `n_answers` independent answers.
///
/// `info` is the task content; the scheduler never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub created: DateTime<Utc>,
    pub state: TaskState,
    pub n_answers: u32,
    /// In [0, 1]; higher is served first under the priority policy.
    pub priority: f64,
    pub calibration: bool,
    pub quorum: u32,
    pub is_broken: bool,
    pub info: serde_json::Value,
}

impl Task {
    /// Fraction of the redundancy target reached by `answers`.
    ///
    /// A task with `n_answers == 0` reports 0 and is never complete by count.
    pub fn pct_complete(&self, answers: u64) -> f64 {
        if self.n_answers == 0 {
            return 0.0;
        }
        answers as f64 / f64::from(self.n_answers)
    }

    /// Has the answer count reached the redundancy target?
    pub fn quorum_met(&self, answers: u64) -> bool {
        self.n_answers > 0 && answers >= u64::from(self.n_answers)
    }

    /// Serving order under the priority policy: higher priority first, then
    /// older (lower id) first.
    pub fn priority_order(&self, other: &Task) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Can this task be handed to a volunteer at all?
    pub fn is_schedulable(&self) -> bool {
        !self.is_broken && self.state.is_open()
    }
}

/// Input for creating a task. The store assigns `id` and `created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub n_answers: u32,
    pub priority: f64,
    pub calibration: bool,
    pub quorum: u32,
    pub info: serde_json::Value,
}

impl NewTask {
    pub fn new(project_id: ProjectId, info: serde_json::Value) -> Self {
        Self {
            project_id,
            n_answers: DEFAULT_N_ANSWERS,
            priority: 0.0,
            calibration: false,
            quorum: 0,
            info,
        }
    }

    pub fn with_n_answers(mut self, n_answers: u32) -> Self {
        self.n_answers = n_answers;
        self
    }

    /// Priority is clamped into [0, 1]; NaN becomes 0.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = if priority.is_nan() {
            0.0
        } else {
            priority.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_calibration(mut self, calibration: bool) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_quorum(mut self, quorum: u32) -> Self {
        self.quorum = quorum;
        self
    }

    /// Materialize the record once the store has allocated an id.
    pub fn into_task(self, id: TaskId, created: DateTime<Utc>) -> Task {
        Task {
            id,
            project_id: self.project_id,
            created,
            state: TaskState::Ongoing,
            n_answers: self.n_answers,
            priority: self.priority,
            calibration: self.calibration,
            quorum: self.quorum,
            is_broken: false,
            info: self.info,
        }
    }
}
