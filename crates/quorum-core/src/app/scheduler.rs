//! Scheduler - picks the next task for an identity.
//!
//! Selection is read-only. Stamping the chosen task is left to the caller
//! (see `App::new_task`) so that a task computed but never delivered does not
//! hold a reservation.
//!
//! # Flow
//! 1. load the project (`ProjectNotFound` if missing)
//! 2. anonymous identity on a closed project -> `Assignment::Forbidden`
//! 3. resolve the policy: request hint, then project `sched`, then default
//! 4. exclude tasks the identity answered, and tasks it holds a stamp for
//!    unless the policy is locked
//! 5. fetch eligible tasks in store order, rank them, skip `offset`
//!
//! # Failure handling
//! Project, task and answer store calls are bounded by the store timeout and
//! surface as `Unavailable`. Stamp lookups go through [`ContributionGuard`],
//! which never fails a request.
//!
//! # Concurrency
//! Nothing is locked across calls. Two overlapping requests from one identity
//! may both get the same task; the answer store's uniqueness check rejects the
//! second answer.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::deadline::bounded;
use super::guard::ContributionGuard;
use super::ordering;
use crate::domain::{
    Assignment, Identity, ProjectId, QuorumError, Result, SchedulingPolicy, TaskId,
};
use crate::ports::{AnswerStore, EligibleQuery, ProjectStore, TaskStore};

/// Parameters of one `next_task` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextTaskRequest {
    pub project_id: ProjectId,
    pub identity: Identity,
    /// Policy name; `None` uses the project's configured policy.
    pub policy: Option<String>,
    /// Skip this many eligible tasks in policy order.
    pub offset: usize,
    /// Seed for the random policy. Without it every call draws a fresh order.
    pub seed: Option<u64>,
}

impl NextTaskRequest {
    pub fn new(project_id: ProjectId, identity: Identity) -> Self {
        Self {
            project_id,
            identity,
            policy: None,
            offset: 0,
            seed: None,
        }
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

pub struct Scheduler {
    projects: Arc<dyn ProjectStore>,
    tasks: Arc<dyn TaskStore>,
    answers: Arc<dyn AnswerStore>,
    guard: Arc<ContributionGuard>,
    timeout: Duration,
}

impl Scheduler {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        tasks: Arc<dyn TaskStore>,
        answers: Arc<dyn AnswerStore>,
        guard: Arc<ContributionGuard>,
        timeout: Duration,
    ) -> Self {
        Self {
            projects,
            tasks,
            answers,
            guard,
            timeout,
        }
    }

    /// Select the next task for `request.identity`.
    ///
    /// Returns `Assignment::Forbidden` for anonymous identities on projects
    /// that disallow them and `Assignment::Empty` when nothing is eligible.
    /// Fails with `ProjectNotFound` for unknown projects and `Unavailable`
    /// when a store call fails or times out. Stamp store trouble is not an
    /// error; stamps are simply ignored.
    #[tracing::instrument(
        skip(self, request),
        fields(project = %request.project_id, identity = %request.identity, offset = request.offset)
    )]
    pub async fn next_task(&self, request: &NextTaskRequest) -> Result<Assignment> {
        let project = bounded(
            self.timeout,
            "projects.get",
            self.projects.get(request.project_id),
        )
        .await?
        .ok_or(QuorumError::ProjectNotFound(request.project_id))?;

        if request.identity.is_anonymous() && !project.allow_anonymous_contributors {
            tracing::debug!("anonymous contribution not allowed");
            return Ok(Assignment::Forbidden);
        }

        let policy = SchedulingPolicy::resolve(request.policy.as_deref(), &project);

        let answered = bounded(
            self.timeout,
            "answers.answered_tasks",
            self.answers
                .answered_tasks(request.project_id, &request.identity),
        )
        .await?;

        let held: HashSet<TaskId> = self
            .guard
            .active_stamps(&request.identity)
            .await
            .into_iter()
            .collect();

        let mut query = EligibleQuery::new(request.project_id, ordering::store_order(policy))
            .excluding(answered);
        if !ordering::keeps_stamped(policy) {
            query = query.excluding(held.iter().copied());
        }

        let candidates = bounded(self.timeout, "tasks.eligible", self.tasks.eligible(query)).await?;
        let eligible = candidates.len();

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let picked = ordering::select(policy, candidates, &held, request.offset, &mut rng);

        match &picked {
            Some(task) => tracing::debug!(%policy, eligible, task = %task.id, "selected task"),
            None => tracing::debug!(%policy, eligible, "no task available"),
        }
        Ok(Assignment::from(picked))
    }
}
