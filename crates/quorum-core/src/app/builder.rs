//! AppBuilder - wiring stores, config and clock into an [`App`].
//!
//! Fail-fast: `build()` reports every missing component at once and rejects
//! invalid configuration before anything is served.

use std::sync::Arc;

use super::config::SchedulerConfig;
use super::guard::ContributionGuard;
use super::progress::{ProgressCache, ProgressCounter};
use super::recorder::AnswerRecorder;
use super::scheduler::Scheduler;
use crate::impls::{
    InMemoryAnswerStore, InMemoryProjectStore, InMemoryStampStore, InMemoryTaskStore,
};
use crate::ports::{AnswerStore, Clock, ProjectStore, StampStore, SystemClock, TaskStore};

/// Builds an [`App`].
///
/// ```ignore
/// let app = AppBuilder::new()
///     .config(config)
///     .projects(projects)
///     .tasks(tasks)
///     .answers(answers)
///     .stamps(stamps)
///     .build()?;
/// ```
pub struct AppBuilder {
    config: SchedulerConfig,
    projects: Option<Arc<dyn ProjectStore>>,
    tasks: Option<Arc<dyn TaskStore>>,
    answers: Option<Arc<dyn AnswerStore>>,
    stamps: Option<Arc<dyn StampStore>>,
    clock: Arc<dyn Clock>,
    cache: Option<ProgressCache>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing components: {0:?}. Register them before build().")]
    MissingComponents(Vec<&'static str>),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            projects: None,
            tasks: None,
            answers: None,
            stamps: None,
            clock: Arc::new(SystemClock),
            cache: None,
        }
    }

    /// All four stores in memory. Returns the project store too, since
    /// projects are created outside the scheduler.
    pub fn in_memory() -> (Self, Arc<InMemoryProjectStore>) {
        let projects = Arc::new(InMemoryProjectStore::new());
        let builder = Self::new()
            .projects(projects.clone())
            .tasks(Arc::new(InMemoryTaskStore::new()))
            .answers(Arc::new(InMemoryAnswerStore::new()))
            .stamps(Arc::new(InMemoryStampStore::new()));
        (builder, projects)
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn projects(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.projects = Some(store);
        self
    }

    pub fn tasks(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(store);
        self
    }

    pub fn answers(mut self, store: Arc<dyn AnswerStore>) -> Self {
        self.answers = Some(store);
        self
    }

    pub fn stamps(mut self, store: Arc<dyn StampStore>) -> Self {
        self.stamps = Some(store);
        self
    }

    /// Clock for stamp expiry. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a progress cache between apps. Defaults to one sized from config.
    pub fn progress_cache(mut self, cache: ProgressCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        self.config
            .validate()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;

        let mut missing = Vec::new();
        if self.projects.is_none() {
            missing.push("projects");
        }
        if self.tasks.is_none() {
            missing.push("tasks");
        }
        if self.answers.is_none() {
            missing.push("answers");
        }
        if self.stamps.is_none() {
            missing.push("stamps");
        }
        let (Some(projects), Some(tasks), Some(answers), Some(stamps)) =
            (self.projects, self.tasks, self.answers, self.stamps)
        else {
            return Err(BuildError::MissingComponents(missing));
        };

        let config = self.config;
        let timeout = config.store_timeout();
        let guard = Arc::new(ContributionGuard::new(
            stamps,
            self.clock,
            config.stamp_ttl(),
            config.guard_timeout(),
        ));
        let cache = self
            .cache
            .unwrap_or_else(|| ProgressCache::from_config(&config));
        let progress = Arc::new(ProgressCounter::new(
            tasks.clone(),
            answers.clone(),
            cache,
            timeout,
        ));
        let scheduler = Scheduler::new(
            projects.clone(),
            tasks.clone(),
            answers.clone(),
            guard.clone(),
            timeout,
        );
        let recorder = AnswerRecorder::new(
            projects.clone(),
            tasks.clone(),
            answers.clone(),
            guard.clone(),
            progress.clone(),
            timeout,
        );

        Ok(App {
            config,
            projects,
            tasks,
            answers,
            guard,
            progress,
            scheduler,
            recorder,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The scheduling core, ready to serve. Operations live in `app::service`.
pub struct App {
    pub(crate) config: SchedulerConfig,
    pub(crate) projects: Arc<dyn ProjectStore>,
    pub(crate) tasks: Arc<dyn TaskStore>,
    pub(crate) answers: Arc<dyn AnswerStore>,
    pub(crate) guard: Arc<ContributionGuard>,
    pub(crate) progress: Arc<ProgressCounter>,
    pub(crate) scheduler: Scheduler,
    pub(crate) recorder: AnswerRecorder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_builds_with_configured_stamp_ttl() {
        let (builder, _) = AppBuilder::in_memory();
        let config = SchedulerConfig {
            stamp_ttl_secs: 90,
            ..SchedulerConfig::default()
        };
        let app = builder.config(config).build().unwrap();
        assert_eq!(app.guard().ttl(), chrono::Duration::seconds(90));
    }

    #[test]
    fn missing_components_are_all_reported() {
        let app = AppBuilder::new()
            .tasks(Arc::new(InMemoryTaskStore::new()))
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingComponents(missing)) if missing == vec!["projects", "answers", "stamps"]
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (builder, _) = AppBuilder::in_memory();
        let config = SchedulerConfig {
            stamp_ttl_secs: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            builder.config(config).build(),
            Err(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn oversized_progress_ttl_fails_build_instead_of_cache_construction() {
        let (builder, _) = AppBuilder::in_memory();
        let config = SchedulerConfig {
            progress_ttl_secs: i64::MAX as u64,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            builder.config(config).build(),
            Err(BuildError::InvalidConfig(_))
        ));
    }
}
