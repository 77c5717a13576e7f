//! The slice of a Project the scheduler consumes.

use serde::{Deserialize, Serialize};

use super::ids::ProjectId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default = "allow_anonymous_by_default")]
    pub allow_anonymous_contributors: bool,
    #[serde(default)]
    pub info: ProjectInfo,
}

/// Free-form project settings. Only `sched` is interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Name of the configured scheduling policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sched: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn allow_anonymous_by_default() -> bool {
    true
}

impl Project {
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            allow_anonymous_contributors: true,
            info: ProjectInfo::default(),
        }
    }

    pub fn with_anonymous_contributors(mut self, allow: bool) -> Self {
        self.allow_anonymous_contributors = allow;
        self
    }

    pub fn with_sched(mut self, sched: impl Into<String>) -> Self {
        self.info.sched = Some(sched.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_json_without_flags_allows_anonymous() {
        let json = r#"{ "id": 3, "info": { "sched": "random", "thumbnail": "x.png" } }"#;
        let project: Project = serde_json::from_str(json).expect("deserialize");
        assert!(project.allow_anonymous_contributors);
        assert_eq!(project.info.sched.as_deref(), Some("random"));
        assert_eq!(project.info.extra["thumbnail"], "x.png");
    }
}
