//! App operations: the surface an API layer calls.

use std::sync::Arc;

use super::builder::App;
use super::config::SchedulerConfig;
use super::deadline::bounded;
use super::guard::ContributionGuard;
use super::scheduler::NextTaskRequest;
use crate::domain::{
    Assignment, Identity, NewTask, Progress, Project, ProjectId, QuorumError, Result, Task,
    TaskId, TaskRun, TaskState,
};

/// What a project deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Purged {
    pub tasks: u64,
    pub answers: u64,
}

impl App {
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn guard(&self) -> &Arc<ContributionGuard> {
        &self.guard
    }

    /// Select the next task and, if one is handed out, stamp it for the
    /// identity. Forbidden and empty outcomes leave no stamp behind.
    pub async fn new_task(&self, request: &NextTaskRequest) -> Result<Assignment> {
        let assignment = self.scheduler.next_task(request).await?;
        if let Assignment::Task(task) = &assignment {
            self.guard.stamp(task, &request.identity).await;
        }
        Ok(assignment)
    }

    pub async fn submit_answer(
        &self,
        task_id: TaskId,
        identity: Identity,
        info: serde_json::Value,
    ) -> Result<TaskRun> {
        self.recorder.submit(task_id, identity, info).await
    }

    /// Done/total for `identity` in the project. Figures may be up to the
    /// progress TTL old.
    pub async fn user_progress(&self, project_id: ProjectId, identity: &Identity) -> Result<Progress> {
        self.project(project_id).await?;
        self.progress.progress(project_id, identity).await
    }

    pub async fn create_task(&self, task: NewTask) -> Result<Task> {
        let project_id = task.project_id;
        self.project(project_id).await?;
        let task = bounded(self.timeout(), "tasks.insert", self.tasks.insert(task)).await?;
        self.progress.invalidate_total(project_id).await;
        tracing::debug!(project = %project_id, task = %task.id, "task created");
        Ok(task)
    }

    /// Create one task per `info`, each with the configured default redundancy.
    pub async fn import_tasks<I>(&self, project_id: ProjectId, infos: I) -> Result<Vec<Task>>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        self.project(project_id).await?;
        let mut created = Vec::new();
        for info in infos {
            let draft =
                NewTask::new(project_id, info).with_n_answers(self.config.default_n_answers);
            created.push(bounded(self.timeout(), "tasks.insert", self.tasks.insert(draft)).await?);
        }
        self.progress.invalidate_total(project_id).await;
        tracing::info!(project = %project_id, count = created.len(), "tasks imported");
        Ok(created)
    }

    /// Change a task's redundancy target and re-derive its state.
    pub async fn update_n_answers(&self, task_id: TaskId, n_answers: u32) -> Result<Task> {
        bounded(
            self.timeout(),
            "tasks.set_n_answers",
            self.tasks.set_n_answers(task_id, n_answers),
        )
        .await?;
        self.recorder.reconcile(task_id).await
    }

    pub async fn mark_broken(&self, task_id: TaskId, is_broken: bool) -> Result<Task> {
        let task = bounded(
            self.timeout(),
            "tasks.set_broken",
            self.tasks.set_broken(task_id, is_broken),
        )
        .await?;
        tracing::info!(task = %task_id, is_broken, "task broken flag changed");
        Ok(task)
    }

    /// Close a task regardless of its answer count.
    pub async fn close_task(&self, task_id: TaskId) -> Result<Task> {
        bounded(
            self.timeout(),
            "tasks.set_state",
            self.tasks.set_state(task_id, TaskState::Completed),
        )
        .await
    }

    pub async fn task(&self, task_id: TaskId) -> Result<Task> {
        bounded(self.timeout(), "tasks.get", self.tasks.get(task_id))
            .await?
            .ok_or(QuorumError::TaskNotFound(task_id))
    }

    /// Answers recorded for a task. Unknown tasks are `TaskNotFound`.
    pub async fn task_runs(&self, task_id: TaskId) -> Result<Vec<TaskRun>> {
        self.task(task_id).await?;
        bounded(self.timeout(), "answers.list_by_task", self.answers.list_by_task(task_id)).await
    }

    /// Remove every task and answer of a project. The project record itself
    /// belongs to the project collaborator.
    pub async fn delete_project(&self, project_id: ProjectId) -> Result<Purged> {
        let answers = bounded(
            self.timeout(),
            "answers.delete_project",
            self.answers.delete_project(project_id),
        )
        .await?;
        let tasks = bounded(
            self.timeout(),
            "tasks.delete_project",
            self.tasks.delete_project(project_id),
        )
        .await?;
        self.progress.invalidate_total(project_id).await;
        tracing::info!(project = %project_id, tasks, answers, "project purged");
        Ok(Purged { tasks, answers })
    }

    async fn project(&self, project_id: ProjectId) -> Result<Project> {
        bounded(self.timeout(), "projects.get", self.projects.get(project_id))
            .await?
            .ok_or(QuorumError::ProjectNotFound(project_id))
    }

    fn timeout(&self) -> std::time::Duration {
        self.config.store_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::AppBuilder;
    use crate::domain::UserId;
    use crate::impls::{
        InMemoryAnswerStore, InMemoryProjectStore, InMemoryStampStore, InMemoryTaskStore,
    };
    use crate::ports::FixedClock;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::net::IpAddr;

    const P1: ProjectId = ProjectId::new(1);

    struct Fixture {
        app: Arc<App>,
        stamps: Arc<InMemoryStampStore>,
        clock: Arc<FixedClock>,
    }

    async fn fixture(project: Project) -> Fixture {
        let projects = Arc::new(InMemoryProjectStore::new());
        projects.upsert(project).await;
        let stamps = Arc::new(InMemoryStampStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let app = AppBuilder::new()
            .projects(projects)
            .tasks(Arc::new(InMemoryTaskStore::new()))
            .answers(Arc::new(InMemoryAnswerStore::new()))
            .stamps(stamps.clone())
            .clock(clock.clone())
            .build()
            .unwrap();
        Fixture {
            app: Arc::new(app),
            stamps,
            clock,
        }
    }

    async fn add(app: &App, n_answers: u32, priority: f64) -> Task {
        app.create_task(
            NewTask::new(P1, serde_json::json!({}))
                .with_n_answers(n_answers)
                .with_priority(priority),
        )
        .await
        .unwrap()
    }

    fn user(id: u64) -> Identity {
        Identity::User(UserId::new(id))
    }

    fn req(identity: Identity) -> NextTaskRequest {
        NextTaskRequest::new(P1, identity)
    }

    #[tokio::test]
    async fn anonymous_on_closed_project_gets_forbidden_and_no_stamp() {
        let f = fixture(Project::new(P1).with_anonymous_contributors(false)).await;
        add(&f.app, 3, 0.0).await;
        let ip: IpAddr = "203.0.113.5".parse().unwrap();

        let outcome = f.app.new_task(&req(Identity::Anonymous(ip))).await.unwrap();
        assert!(outcome.is_forbidden());
        assert!(!outcome.is_empty());
        assert!(f.stamps.is_empty().await);
    }

    #[tokio::test]
    async fn single_answer_task_completes_and_disappears() {
        let f = fixture(Project::new(P1)).await;
        let t = add(&f.app, 1, 0.0).await;

        let got = f.app.new_task(&req(user(1))).await.unwrap();
        assert_eq!(got.task().map(|t| t.id), Some(t.id));
        f.app
            .submit_answer(t.id, user(1), serde_json::json!({"answer": "yes"}))
            .await
            .unwrap();

        let outcome = f.app.new_task(&req(user(2))).await.unwrap();
        assert!(outcome.is_empty());
        assert!(f.stamps.is_empty().await);
    }

    #[tokio::test]
    async fn priority_offsets_walk_down_the_ranking() {
        let f = fixture(Project::new(P1)).await;
        let t1 = add(&f.app, 3, 0.2).await;
        let t2 = add(&f.app, 3, 0.9).await;

        let first = f
            .app
            .new_task(&req(user(1)).with_policy("priority"))
            .await
            .unwrap();
        assert_eq!(first.task().map(|t| t.id), Some(t2.id));

        // a different identity so the stamp from above does not interfere
        let second = f
            .app
            .new_task(&req(user(2)).with_policy("priority").with_offset(1))
            .await
            .unwrap();
        assert_eq!(second.task().map(|t| t.id), Some(t1.id));
    }

    #[tokio::test]
    async fn locked_policy_keeps_serving_the_held_task() {
        let f = fixture(Project::new(P1)).await;
        let t1 = add(&f.app, 3, 0.0).await;
        add(&f.app, 3, 0.0).await;

        let first = f.app.new_task(&req(user(1))).await.unwrap();
        assert_eq!(first.task().map(|t| t.id), Some(t1.id));

        let again = f
            .app
            .new_task(&req(user(1)).with_policy("locked"))
            .await
            .unwrap();
        assert_eq!(again.task().map(|t| t.id), Some(t1.id));

        // once the stamp expires the lock is gone but T1 is still oldest
        f.clock.advance(chrono::Duration::minutes(11));
        assert!(!f.app.guard().is_stamped(t1.id, &user(1)).await);
    }

    #[tokio::test]
    async fn default_skips_a_task_still_held_by_the_same_identity() {
        let f = fixture(Project::new(P1)).await;
        let t1 = add(&f.app, 3, 0.0).await;
        let t2 = add(&f.app, 3, 0.0).await;

        let first = f.app.new_task(&req(user(1))).await.unwrap();
        assert_eq!(first.task().map(|t| t.id), Some(t1.id));
        let second = f.app.new_task(&req(user(1))).await.unwrap();
        assert_eq!(second.task().map(|t| t.id), Some(t2.id));

        // other identities are not blocked by user 1's stamps
        let other = f.app.new_task(&req(user(2))).await.unwrap();
        assert_eq!(other.task().map(|t| t.id), Some(t1.id));

        f.clock.advance(chrono::Duration::minutes(11));
        let after_expiry = f.app.new_task(&req(user(1))).await.unwrap();
        assert_eq!(after_expiry.task().map(|t| t.id), Some(t1.id));
    }

    #[tokio::test]
    async fn never_serves_an_answered_task() {
        let f = fixture(Project::new(P1)).await;
        for _ in 0..5 {
            add(&f.app, 10, 0.0).await;
        }

        let mut answered = HashSet::new();
        while let Some(task) = f.app.new_task(&req(user(1))).await.unwrap().into_task() {
            assert!(answered.insert(task.id), "served {} twice", task.id);
            f.app
                .submit_answer(task.id, user(1), serde_json::json!({}))
                .await
                .unwrap();
        }
        assert_eq!(answered.len(), 5);
    }

    #[tokio::test]
    async fn user_progress_counts_answers() {
        let f = fixture(Project::new(P1)).await;
        let t = add(&f.app, 3, 0.0).await;
        add(&f.app, 3, 0.0).await;

        let before = f.app.user_progress(P1, &user(1)).await.unwrap();
        assert_eq!(before, Progress::new(0, 2));

        f.app.submit_answer(t.id, user(1), serde_json::json!({})).await.unwrap();
        let after = f.app.user_progress(P1, &user(1)).await.unwrap();
        assert_eq!(after, Progress::new(1, 2));
    }

    #[tokio::test]
    async fn user_progress_of_unknown_project_is_not_found() {
        let f = fixture(Project::new(P1)).await;
        let err = f
            .app
            .user_progress(ProjectId::new(42), &user(1))
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn task_lookups_of_unknown_ids_are_not_found() {
        let f = fixture(Project::new(P1)).await;
        let missing = TaskId::new(404);
        assert!(f.app.task(missing).await.unwrap_err().is_not_found());
        assert!(f.app.task_runs(missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn import_uses_configured_redundancy() {
        let f = fixture(Project::new(P1)).await;
        let tasks = f
            .app
            .import_tasks(P1, [serde_json::json!({"q": 1}), serde_json::json!({"q": 2})])
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.n_answers == f.app.config().default_n_answers));

        let err = f
            .app
            .import_tasks(ProjectId::new(9), [serde_json::json!({})])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_n_answers_completes_and_reopens() {
        let f = fixture(Project::new(P1)).await;
        let t = add(&f.app, 3, 0.0).await;
        f.app.submit_answer(t.id, user(1), serde_json::json!({})).await.unwrap();

        let lowered = f.app.update_n_answers(t.id, 1).await.unwrap();
        assert_eq!(lowered.state, TaskState::Completed);
        assert!(f.app.new_task(&req(user(2))).await.unwrap().is_empty());

        let raised = f.app.update_n_answers(t.id, 2).await.unwrap();
        assert_eq!(raised.state, TaskState::Ongoing);
        let got = f.app.new_task(&req(user(2))).await.unwrap();
        assert_eq!(got.task().map(|t| t.id), Some(t.id));
    }

    #[tokio::test]
    async fn broken_and_closed_tasks_are_not_served() {
        let f = fixture(Project::new(P1)).await;
        let t1 = add(&f.app, 3, 0.0).await;
        let t2 = add(&f.app, 0, 0.0).await;

        f.app.mark_broken(t1.id, true).await.unwrap();
        let got = f.app.new_task(&req(user(1))).await.unwrap();
        assert_eq!(got.task().map(|t| t.id), Some(t2.id));

        f.app.close_task(t2.id).await.unwrap();
        assert!(f.app.new_task(&req(user(2))).await.unwrap().is_empty());

        f.app.mark_broken(t1.id, false).await.unwrap();
        let got = f.app.new_task(&req(user(2))).await.unwrap();
        assert_eq!(got.task().map(|t| t.id), Some(t1.id));
    }

    #[tokio::test]
    async fn delete_project_cascades() {
        let f = fixture(Project::new(P1)).await;
        let t = add(&f.app, 3, 0.0).await;
        add(&f.app, 3, 0.0).await;
        f.app.submit_answer(t.id, user(1), serde_json::json!({})).await.unwrap();

        assert_eq!(f.app.task_runs(t.id).await.unwrap().len(), 1);

        let purged = f.app.delete_project(P1).await.unwrap();
        assert_eq!(purged, Purged { tasks: 2, answers: 1 });
        assert!(matches!(
            f.app.task_runs(t.id).await,
            Err(QuorumError::TaskNotFound(id)) if id == t.id
        ));
        assert_eq!(f.app.user_progress(P1, &user(2)).await.unwrap().total, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_volunteers_finish_every_task() {
        let f = fixture(Project::new(P1)).await;
        let n_answers = 3;
        let mut ids = Vec::new();
        for _ in 0..12 {
            ids.push(add(&f.app, n_answers, 0.0).await.id);
        }

        let mut handles = Vec::new();
        for v in 1..=6u64 {
            let app = f.app.clone();
            handles.push(tokio::spawn(async move {
                let identity = user(v);
                let mut served = HashSet::new();
                loop {
                    let request = NextTaskRequest::new(P1, identity);
                    let Some(task) = app.new_task(&request).await?.into_task() else {
                        break;
                    };
                    assert!(served.insert(task.id), "{identity} served {} twice", task.id);
                    match app.submit_answer(task.id, identity, serde_json::json!({})).await {
                        Ok(_) | Err(QuorumError::TaskClosed(_)) => {}
                        Err(other) => return Err(other),
                    }
                }
                Ok::<_, QuorumError>(())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for id in ids {
            let runs = f.app.task_runs(id).await.unwrap();
            assert!(runs.len() >= n_answers as usize);
            let who: HashSet<Identity> = runs.iter().map(|r| r.identity).collect();
            assert_eq!(who.len(), runs.len());
            assert!(f.app.new_task(&req(user(99))).await.unwrap().is_empty());
        }
    }
}
