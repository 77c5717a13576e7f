//! AnswerRecorder - the answer insertion path.
//!
//! The answer store's unique (task, identity) insert is what keeps an identity
//! from being credited twice; the scheduler's exclusions and stamps only make
//! duplicates rare. After each accepted answer the task's state is re-derived
//! from the live answer count.
//!
//! # Flow
//! 1. load the task; completed or broken tasks are `TaskClosed`
//! 2. apply the project's anonymous rule
//! 3. insert the answer (duplicate -> `Conflict`)
//! 4. release the identity's stamp and drop its cached progress
//! 5. reconcile the task state
//!
//! # Failure handling
//! Everything before step 3 propagates. Once the answer is stored the call
//! succeeds: a failed reconcile is logged and retried by the next submission
//! for the task, including the caller's own retry that ends in `Conflict`.

use std::sync::Arc;
use std::time::Duration;

use super::deadline::bounded;
use super::guard::ContributionGuard;
use super::progress::ProgressCounter;
use crate::domain::{
    Identity, NewTaskRun, QuorumError, Result, Task, TaskId, TaskRun, TaskState,
};
use crate::ports::{AnswerStore, ProjectStore, TaskStore};

pub struct AnswerRecorder {
    projects: Arc<dyn ProjectStore>,
    tasks: Arc<dyn TaskStore>,
    answers: Arc<dyn AnswerStore>,
    guard: Arc<ContributionGuard>,
    progress: Arc<ProgressCounter>,
    timeout: Duration,
}

impl AnswerRecorder {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        tasks: Arc<dyn TaskStore>,
        answers: Arc<dyn AnswerStore>,
        guard: Arc<ContributionGuard>,
        progress: Arc<ProgressCounter>,
        timeout: Duration,
    ) -> Self {
        Self {
            projects,
            tasks,
            answers,
            guard,
            progress,
            timeout,
        }
    }

    /// Record `identity`'s answer to `task_id`.
    ///
    /// Errors:
    /// - `TaskNotFound` / `ProjectNotFound` for unknown records
    /// - `TaskClosed` if the task is completed or broken
    /// - `Forbidden` for anonymous identities on closed projects
    /// - `Conflict` if this identity already answered the task
    /// - `Unavailable` on store failure or timeout
    #[tracing::instrument(skip(self, info), fields(task = %task_id, identity = %identity))]
    pub async fn submit(
        &self,
        task_id: TaskId,
        identity: Identity,
        info: serde_json::Value,
    ) -> Result<TaskRun> {
        let task = self.load(task_id).await?;
        if !task.is_schedulable() {
            return Err(QuorumError::TaskClosed(task_id));
        }

        let project = bounded(
            self.timeout,
            "projects.get",
            self.projects.get(task.project_id),
        )
        .await?
        .ok_or(QuorumError::ProjectNotFound(task.project_id))?;
        if identity.is_anonymous() && !project.allow_anonymous_contributors {
            return Err(QuorumError::Forbidden {
                project_id: project.id,
                identity,
            });
        }

        let inserted = bounded(
            self.timeout,
            "answers.insert",
            self.answers.insert(NewTaskRun {
                task_id,
                project_id: task.project_id,
                identity,
                info,
            }),
        )
        .await;
        let run = match inserted {
            Ok(run) => run,
            Err(err @ QuorumError::Conflict { .. }) => {
                tracing::debug!("duplicate answer rejected");
                // a retry after a failed state update lands here
                self.settle(task_id).await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        self.guard.release(task_id, &identity).await;
        self.progress
            .invalidate_done(task.project_id, &identity)
            .await;

        self.settle(task_id).await;
        Ok(run)
    }

    /// Reconcile once an answer is stored. The answer stands even when the
    /// state update fails; the next submission for the task retries it.
    async fn settle(&self, task_id: TaskId) {
        if let Err(err) = self.reconcile(task_id).await {
            tracing::warn!(task = %task_id, error = %err, "answer recorded but task state not updated");
        }
    }

    /// Re-derive a task's state from its answer count and redundancy target.
    ///
    /// Completes an ongoing task whose target is met and reopens a completed
    /// one whose target now exceeds the count. Tasks with `n_answers == 0`
    /// are left alone; they only close manually.
    pub async fn reconcile(&self, task_id: TaskId) -> Result<Task> {
        let task = self.load(task_id).await?;
        if task.n_answers == 0 {
            return Ok(task);
        }

        let answers = self.progress.count_answers(task_id).await?;
        let target = if task.quorum_met(answers) {
            TaskState::Completed
        } else {
            TaskState::Ongoing
        };
        if task.state == target {
            return Ok(task);
        }

        let task = bounded(
            self.timeout,
            "tasks.set_state",
            self.tasks.set_state(task_id, target),
        )
        .await?;
        match target {
            TaskState::Completed => {
                tracing::info!(task = %task_id, answers, n_answers = task.n_answers, "task completed")
            }
            TaskState::Ongoing => {
                tracing::info!(task = %task_id, answers, n_answers = task.n_answers, "task reopened")
            }
        }
        Ok(task)
    }

    async fn load(&self, task_id: TaskId) -> Result<Task> {
        bounded(self.timeout, "tasks.get", self.tasks.get(task_id))
            .await?
            .ok_or(QuorumError::TaskNotFound(task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::progress::ProgressCache;
    use crate::domain::{NewTask, Project, ProjectId, UserId};
    use crate::impls::{
        InMemoryAnswerStore, InMemoryProjectStore, InMemoryStampStore, InMemoryTaskStore,
    };
    use crate::ports::{EligibleQuery, FixedClock, StoreError};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicBool, Ordering};

    const P1: ProjectId = ProjectId::new(1);

    struct Fixture {
        recorder: Arc<AnswerRecorder>,
        tasks: Arc<InMemoryTaskStore>,
        answers: Arc<InMemoryAnswerStore>,
        guard: Arc<ContributionGuard>,
    }

    async fn fixture(project: Project) -> Fixture {
        let projects = Arc::new(InMemoryProjectStore::new());
        projects.upsert(project).await;
        let tasks = Arc::new(InMemoryTaskStore::new());
        let answers = Arc::new(InMemoryAnswerStore::new());
        let guard = Arc::new(ContributionGuard::new(
            Arc::new(InMemoryStampStore::new()),
            Arc::new(FixedClock::new(Utc::now())),
            chrono::Duration::minutes(10),
            Duration::from_millis(100),
        ));
        let progress = Arc::new(ProgressCounter::new(
            tasks.clone(),
            answers.clone(),
            ProgressCache::new(Duration::from_secs(60), 100),
            Duration::from_secs(1),
        ));
        let recorder = Arc::new(AnswerRecorder::new(
            projects,
            tasks.clone(),
            answers.clone(),
            guard.clone(),
            progress,
            Duration::from_secs(1),
        ));
        Fixture {
            recorder,
            tasks,
            answers,
            guard,
        }
    }

    async fn add_task(f: &Fixture, n_answers: u32) -> Task {
        f.tasks
            .insert(NewTask::new(P1, serde_json::json!({})).with_n_answers(n_answers))
            .await
            .unwrap()
    }

    fn user(id: u64) -> Identity {
        Identity::User(UserId::new(id))
    }

    #[tokio::test]
    async fn reaching_n_answers_completes_the_task() {
        let f = fixture(Project::new(P1)).await;
        let task = add_task(&f, 2).await;

        f.recorder
            .submit(task.id, user(1), serde_json::json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(f.tasks.get(task.id).await.unwrap().unwrap().state, TaskState::Ongoing);

        f.recorder
            .submit(task.id, user(2), serde_json::json!({"a": 2}))
            .await
            .unwrap();
        assert_eq!(f.tasks.get(task.id).await.unwrap().unwrap().state, TaskState::Completed);
    }

    #[tokio::test]
    async fn completed_task_rejects_further_answers() {
        let f = fixture(Project::new(P1)).await;
        let task = add_task(&f, 1).await;
        f.recorder.submit(task.id, user(1), serde_json::json!({})).await.unwrap();

        let err = f
            .recorder
            .submit(task.id, user(2), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::TaskClosed(id) if id == task.id));
    }

    #[tokio::test]
    async fn broken_task_rejects_answers() {
        let f = fixture(Project::new(P1)).await;
        let task = add_task(&f, 3).await;
        f.tasks.set_broken(task.id, true).await.unwrap();

        let err = f
            .recorder
            .submit(task.id, user(1), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::TaskClosed(_)));
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let f = fixture(Project::new(P1)).await;
        let err = f
            .recorder
            .submit(TaskId::new(77), user(1), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn anonymous_answer_on_closed_project_is_forbidden() {
        let f = fixture(Project::new(P1).with_anonymous_contributors(false)).await;
        let task = add_task(&f, 3).await;
        let ip: IpAddr = "192.168.0.9".parse().unwrap();

        let err = f
            .recorder
            .submit(task.id, Identity::Anonymous(ip), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::Forbidden { .. }));
        assert_eq!(f.answers.count_by_task(task.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn accepted_answer_releases_the_stamp() {
        let f = fixture(Project::new(P1)).await;
        let task = add_task(&f, 3).await;
        f.guard.stamp(&task, &user(1)).await;
        assert!(f.guard.is_stamped(task.id, &user(1)).await);

        f.recorder.submit(task.id, user(1), serde_json::json!({})).await.unwrap();
        assert!(!f.guard.is_stamped(task.id, &user(1)).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_credit_exactly_once() {
        let f = fixture(Project::new(P1)).await;
        let task = add_task(&f, 5).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let recorder = f.recorder.clone();
            handles.push(tokio::spawn(async move {
                recorder.submit(task.id, user(1), serde_json::json!({})).await
            }));
        }

        let mut accepted = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(QuorumError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(f.answers.count_by_task(task.id).await.unwrap(), 1);
    }

    /// Task store whose state updates fail while `down` is set.
    struct StatelessTaskStore {
        inner: InMemoryTaskStore,
        down: AtomicBool,
    }

    #[async_trait]
    impl TaskStore for StatelessTaskStore {
        async fn insert(&self, task: NewTask) -> std::result::Result<Task, StoreError> {
            self.inner.insert(task).await
        }
        async fn get(&self, task_id: TaskId) -> std::result::Result<Option<Task>, StoreError> {
            self.inner.get(task_id).await
        }
        async fn eligible(&self, query: EligibleQuery) -> std::result::Result<Vec<Task>, StoreError> {
            self.inner.eligible(query).await
        }
        async fn count(&self, project_id: ProjectId) -> std::result::Result<u64, StoreError> {
            self.inner.count(project_id).await
        }
        async fn set_state(&self, task_id: TaskId, state: TaskState) -> std::result::Result<Task, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("write rejected".into()));
            }
            self.inner.set_state(task_id, state).await
        }
        async fn set_broken(&self, task_id: TaskId, is_broken: bool) -> std::result::Result<Task, StoreError> {
            self.inner.set_broken(task_id, is_broken).await
        }
        async fn set_n_answers(&self, task_id: TaskId, n: u32) -> std::result::Result<Task, StoreError> {
            self.inner.set_n_answers(task_id, n).await
        }
        async fn delete_project(&self, project_id: ProjectId) -> std::result::Result<u64, StoreError> {
            self.inner.delete_project(project_id).await
        }
    }

    #[tokio::test]
    async fn stored_answer_succeeds_when_state_update_fails_and_retry_completes() {
        let projects = Arc::new(InMemoryProjectStore::new());
        projects.upsert(Project::new(P1)).await;
        let tasks = Arc::new(StatelessTaskStore {
            inner: InMemoryTaskStore::new(),
            down: AtomicBool::new(true),
        });
        let answers = Arc::new(InMemoryAnswerStore::new());
        let guard = Arc::new(ContributionGuard::new(
            Arc::new(InMemoryStampStore::new()),
            Arc::new(FixedClock::new(Utc::now())),
            chrono::Duration::minutes(10),
            Duration::from_millis(100),
        ));
        let progress = Arc::new(ProgressCounter::new(
            tasks.clone(),
            answers.clone(),
            ProgressCache::new(Duration::from_secs(60), 100),
            Duration::from_secs(1),
        ));
        let recorder = AnswerRecorder::new(
            projects,
            tasks.clone(),
            answers.clone(),
            guard,
            progress,
            Duration::from_secs(1),
        );
        let task = tasks
            .insert(NewTask::new(P1, serde_json::json!({})).with_n_answers(1))
            .await
            .unwrap();

        recorder.submit(task.id, user(1), serde_json::json!({})).await.unwrap();
        assert_eq!(answers.count_by_task(task.id).await.unwrap(), 1);
        assert_eq!(tasks.get(task.id).await.unwrap().unwrap().state, TaskState::Ongoing);

        tasks.down.store(false, Ordering::SeqCst);
        let err = recorder
            .submit(task.id, user(1), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::Conflict { .. }));
        assert_eq!(tasks.get(task.id).await.unwrap().unwrap().state, TaskState::Completed);
        assert_eq!(answers.count_by_task(task.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reconcile_reopens_when_target_is_raised() {
        let f = fixture(Project::new(P1)).await;
        let task = add_task(&f, 1).await;
        f.recorder.submit(task.id, user(1), serde_json::json!({})).await.unwrap();

        f.tasks.set_n_answers(task.id, 2).await.unwrap();
        let task = f.recorder.reconcile(task.id).await.unwrap();
        assert_eq!(task.state, TaskState::Ongoing);
    }

    #[tokio::test]
    async fn zero_target_never_completes_by_count() {
        let f = fixture(Project::new(P1)).await;
        let task = add_task(&f, 0).await;
        f.recorder.submit(task.id, user(1), serde_json::json!({})).await.unwrap();
        f.recorder.submit(task.id, user(2), serde_json::json!({})).await.unwrap();

        let task = f.tasks.get(task.id).await.unwrap().unwrap();
        assert_eq!(task.state, TaskState::Ongoing);
    }
}
