//! Domain identifiers (strongly-typed IDs).
//!
//! All identifiers are integers assigned by the store that owns the record.
//! `Id<T>` carries a zero-sized marker so a `TaskId` can never be passed where a
//! `ProjectId` is expected, while serializing as the bare integer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for each id kind; provides the `Display` prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic integer id.
///
/// Ordering follows the integer value, which the default scheduling policy
/// relies on ("oldest first").
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub const fn get(&self) -> u64 {
        self.value
    }
}

impl<T: IdMarker> From<u64> for Id<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// Marker types
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Project {}

impl IdMarker for Project {
    fn prefix() -> &'static str {
        "project-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskRun {}

impl IdMarker for TaskRun {
    fn prefix() -> &'static str {
        "taskrun-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn prefix() -> &'static str {
        "user-"
    }
}

/// Identifier of a Project (owner of tasks and answers).
pub type ProjectId = Id<Project>;

/// Identifier of a Task.
pub type TaskId = Id<Task>;

/// Identifier of a TaskRun (one submitted answer).
pub type TaskRunId = Id<TaskRun>;

/// Identifier of an authenticated user.
pub type UserId = Id<User>;
