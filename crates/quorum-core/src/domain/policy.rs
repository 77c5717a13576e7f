//! Scheduling policies (closed set).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::project::Project;

/// Named strategy determining the order in which eligible tasks are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPolicy {
    /// Oldest task first (ascending id).
    #[default]
    Default,
    /// Highest priority first, ties broken by ascending id.
    Priority,
    /// Uniform random choice among eligible tasks.
    Random,
    /// Keep serving the task an identity already holds a stamp for.
    Locked,
}

impl SchedulingPolicy {
    /// Parse a policy name. Unknown names fall back to `Default`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "priority" | "incremental" | "incremental_priority" => SchedulingPolicy::Priority,
            "random" => SchedulingPolicy::Random,
            "locked" | "locked_scheduler" => SchedulingPolicy::Locked,
            "default" | "depth_first" | "breadth_first" => SchedulingPolicy::Default,
            other => {
                tracing::debug!(policy = other, "unknown scheduling policy, using default");
                SchedulingPolicy::Default
            }
        }
    }

    /// Pick the policy for a request: an explicit hint wins over the project's
    /// configured `sched`, which wins over `Default`.
    pub fn resolve(hint: Option<&str>, project: &Project) -> Self {
        hint.or(project.info.sched.as_deref())
            .map(Self::from_name)
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            SchedulingPolicy::Default => "default",
            SchedulingPolicy::Priority => "priority",
            SchedulingPolicy::Random => "random",
            SchedulingPolicy::Locked => "locked",
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
