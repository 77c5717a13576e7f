//! InMemoryTaskStore - task records in process memory.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{NewTask, ProjectId, Task, TaskId, TaskState};
use crate::ports::{Clock, EligibleQuery, StoreError, SystemClock, TaskOrder, TaskStore};

struct InMemoryTaskState {
    /// Keyed by id, so iteration is already "oldest first".
    tasks: BTreeMap<TaskId, Task>,

    /// Next task ID to assign.
    next_task_id: u64,
}

impl InMemoryTaskState {
    fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_task_id: 1,
        }
    }

    fn allocate_task_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    fn update<F>(&mut self, task_id: TaskId, f: F) -> Result<Task, StoreError>
    where
        F: FnOnce(&mut Task),
    {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(StoreError::TaskNotFound(task_id))?;
        f(task);
        Ok(task.clone())
    }
}

pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryTaskState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryTaskState::new())),
            clock,
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let created = self.clock.now();
        let mut state = self.state.lock().await;
        let id = state.allocate_task_id();
        let task = task.into_task(id, created);
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn get(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tasks.get(&task_id).cloned())
    }

    async fn eligible(&self, query: EligibleQuery) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = {
            let state = self.state.lock().await;
            state
                .tasks
                .values()
                .filter(|task| query.matches(task))
                .cloned()
                .collect()
        };
        if query.order == TaskOrder::PriorityDesc {
            tasks.sort_by(Task::priority_order);
        }
        Ok(tasks)
    }

    async fn count(&self, project_id: ProjectId) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.project_id == project_id)
            .count() as u64)
    }

    async fn set_state(&self, task_id: TaskId, new_state: TaskState) -> Result<Task, StoreError> {
        let mut state = self.state.lock().await;
        state.update(task_id, |task| task.state = new_state)
    }

    async fn set_broken(&self, task_id: TaskId, is_broken: bool) -> Result<Task, StoreError> {
        let mut state = self.state.lock().await;
        state.update(task_id, |task| task.is_broken = is_broken)
    }

    async fn set_n_answers(&self, task_id: TaskId, n_answers: u32) -> Result<Task, StoreError> {
        let mut state = self.state.lock().await;
        state.update(task_id, |task| task.n_answers = n_answers)
    }

    async fn delete_project(&self, project_id: ProjectId) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state.tasks.retain(|_, task| task.project_id != project_id);
        Ok((before - state.tasks.len()) as u64)
    }
}
