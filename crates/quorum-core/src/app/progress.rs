//! ProgressCounter - answer counts and per-identity progress.
//!
//! `count_answers` feeds the quorum decision and always reads the answer store.
//! `count_done`/`count_total` only feed the progress figure shown to
//! volunteers, so they go through a [`ProgressCache`] with a short TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use super::config::{MAX_PROGRESS_TTL_SECS, SchedulerConfig};
use super::deadline::bounded;
use crate::domain::{Identity, Progress, ProjectId, Result, TaskId};
use crate::ports::{AnswerStore, TaskStore};

/// Cache for progress figures, injected into the counter.
#[derive(Clone)]
pub struct ProgressCache {
    totals: Cache<ProjectId, u64>,
    done: Cache<(ProjectId, Identity), u64>,
}

impl ProgressCache {
    /// `ttl` is capped at [`MAX_PROGRESS_TTL_SECS`].
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let ttl = ttl.min(Duration::from_secs(MAX_PROGRESS_TTL_SECS));
        Self {
            totals: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            done: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.progress_ttl(), config.progress_cache_capacity)
    }
}

pub struct ProgressCounter {
    tasks: Arc<dyn TaskStore>,
    answers: Arc<dyn AnswerStore>,
    cache: ProgressCache,
    timeout: Duration,
}

impl ProgressCounter {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        answers: Arc<dyn AnswerStore>,
        cache: ProgressCache,
        timeout: Duration,
    ) -> Self {
        Self {
            tasks,
            answers,
            cache,
            timeout,
        }
    }

    /// Answers recorded for a task. Uncached.
    pub async fn count_answers(&self, task_id: TaskId) -> Result<u64> {
        bounded(
            self.timeout,
            "answers.count_by_task",
            self.answers.count_by_task(task_id),
        )
        .await
    }

    /// Answers `identity` has given in the project.
    pub async fn count_done(&self, project_id: ProjectId, identity: &Identity) -> Result<u64> {
        let key = (project_id, *identity);
        if let Some(done) = self.cache.done.get(&key).await {
            return Ok(done);
        }
        let done = bounded(
            self.timeout,
            "answers.count_by_identity",
            self.answers.count_by_identity(project_id, identity),
        )
        .await?;
        self.cache.done.insert(key, done).await;
        Ok(done)
    }

    /// Tasks in the project.
    pub async fn count_total(&self, project_id: ProjectId) -> Result<u64> {
        if let Some(total) = self.cache.totals.get(&project_id).await {
            return Ok(total);
        }
        let total = bounded(self.timeout, "tasks.count", self.tasks.count(project_id)).await?;
        self.cache.totals.insert(project_id, total).await;
        Ok(total)
    }

    pub async fn progress(&self, project_id: ProjectId, identity: &Identity) -> Result<Progress> {
        let done = self.count_done(project_id, identity).await?;
        let total = self.count_total(project_id).await?;
        Ok(Progress::new(done, total))
    }

    /// Forget the identity's cached `done` (after they answered).
    pub async fn invalidate_done(&self, project_id: ProjectId, identity: &Identity) {
        self.cache.done.invalidate(&(project_id, *identity)).await;
    }

    /// Forget the project's cached `total` (after tasks were added or removed).
    pub async fn invalidate_total(&self, project_id: ProjectId) {
        self.cache.totals.invalidate(&project_id).await;
    }
}
