//! InMemoryAnswerStore - TaskRuns in process memory.
//!
//! The uniqueness index and the run list are updated under one lock, which is
//! what makes `insert` safe against concurrent duplicate submissions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Identity, NewTaskRun, ProjectId, TaskId, TaskRun, TaskRunId};
use crate::ports::{AnswerStore, Clock, StoreError, SystemClock};

struct InMemoryAnswerState {
    runs: Vec<TaskRun>,

    /// Unique index over (task, identity).
    answered: HashSet<(TaskId, Identity)>,

    /// Answer count per task.
    per_task: HashMap<TaskId, u64>,

    next_run_id: u64,
}

impl InMemoryAnswerState {
    fn new() -> Self {
        Self {
            runs: Vec::new(),
            answered: HashSet::new(),
            per_task: HashMap::new(),
            next_run_id: 1,
        }
    }

    fn allocate_run_id(&mut self) -> TaskRunId {
        let id = TaskRunId::new(self.next_run_id);
        self.next_run_id += 1;
        id
    }

    fn by_identity<'a>(
        &'a self,
        project_id: ProjectId,
        identity: &'a Identity,
    ) -> impl Iterator<Item = &'a TaskRun> + 'a {
        self.runs
            .iter()
            .filter(move |run| run.project_id == project_id && run.identity == *identity)
    }
}

pub struct InMemoryAnswerStore {
    state: Arc<Mutex<InMemoryAnswerState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAnswerStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryAnswerState::new())),
            clock,
        }
    }
}

impl Default for InMemoryAnswerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerStore for InMemoryAnswerStore {
    async fn insert(&self, run: NewTaskRun) -> Result<TaskRun, StoreError> {
        let created = self.clock.now();
        let mut state = self.state.lock().await;

        if !state.answered.insert((run.task_id, run.identity)) {
            return Err(StoreError::DuplicateAnswer {
                task_id: run.task_id,
                identity: run.identity,
            });
        }

        let id = state.allocate_run_id();
        let run = run.into_task_run(id, created);
        *state.per_task.entry(run.task_id).or_default() += 1;
        state.runs.push(run.clone());
        Ok(run)
    }

    async fn count_by_task(&self, task_id: TaskId) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.per_task.get(&task_id).copied().unwrap_or(0))
    }

    async fn count_by_identity(
        &self,
        project_id: ProjectId,
        identity: &Identity,
    ) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.by_identity(project_id, identity).count() as u64)
    }

    async fn answered_tasks(
        &self,
        project_id: ProjectId,
        identity: &Identity,
    ) -> Result<HashSet<TaskId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .by_identity(project_id, identity)
            .map(|run| run.task_id)
            .collect())
    }

    async fn list_by_task(&self, task_id: TaskId) -> Result<Vec<TaskRun>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .runs
            .iter()
            .filter(|run| run.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete_project(&self, project_id: ProjectId) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let (removed, kept): (Vec<TaskRun>, Vec<TaskRun>) = std::mem::take(&mut state.runs)
            .into_iter()
            .partition(|run| run.project_id == project_id);
        state.runs = kept;
        for run in &removed {
            state.answered.remove(&(run.task_id, run.identity));
            state.per_task.remove(&run.task_id);
        }
        Ok(removed.len() as u64)
    }
}
