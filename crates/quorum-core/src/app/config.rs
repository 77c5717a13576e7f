//! SchedulerConfig - tunables for the scheduler, guard and progress cache.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DEFAULT_N_ANSWERS, QuorumError, Result};

/// Upper bound for `progress_ttl_secs`. Progress figures are meant to be
/// seconds stale, not days.
pub const MAX_PROGRESS_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How long a handed-out task stays reserved for its identity.
    pub stamp_ttl_secs: u64,

    /// Timeout for project/task/answer store calls.
    pub store_timeout_ms: u64,

    /// Timeout for stamp store calls. On expiry the guard is skipped.
    pub guard_timeout_ms: u64,

    /// How long cached done/total counts may be served.
    pub progress_ttl_secs: u64,

    /// Max cached entries per progress kind.
    pub progress_cache_capacity: u64,

    /// Redundancy for imported tasks that do not set one.
    pub default_n_answers: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stamp_ttl_secs: 600,
            store_timeout_ms: 2_000,
            guard_timeout_ms: 500,
            progress_ttl_secs: 30,
            progress_cache_capacity: 10_000,
            default_n_answers: DEFAULT_N_ANSWERS,
        }
    }
}

impl SchedulerConfig {
    /// Load from a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QuorumError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| QuorumError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stamp_ttl_secs == 0 {
            return Err(QuorumError::Config("stamp_ttl_secs must be > 0".into()));
        }
        if self.store_timeout_ms == 0 || self.guard_timeout_ms == 0 {
            return Err(QuorumError::Config("store timeouts must be > 0".into()));
        }
        if self.progress_ttl_secs > MAX_PROGRESS_TTL_SECS {
            return Err(QuorumError::Config(format!(
                "progress_ttl_secs must be <= {MAX_PROGRESS_TTL_SECS}"
            )));
        }
        Ok(())
    }

    pub fn stamp_ttl(&self) -> chrono::Duration {
        i64::try_from(self.stamp_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }

    pub fn progress_ttl(&self) -> Duration {
        Duration::from_secs(self.progress_ttl_secs)
    }
}
