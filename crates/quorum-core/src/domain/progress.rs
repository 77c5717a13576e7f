//! Per-identity progress view.

use serde::{Deserialize, Serialize};

/// How many of a project's tasks an identity has answered.
///
/// Served from a short-lived cache, so `done` may lag behind the answer store
/// by up to the configured TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub done: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(done: u64, total: u64) -> Self {
        Self { done, total }
    }

    /// Fraction in [0, 1]; an empty project reports 0.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.done as f64 / self.total as f64).min(1.0)
        }
    }
}
