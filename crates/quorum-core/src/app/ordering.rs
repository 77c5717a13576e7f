//! Policy ordering: eligible candidates -> ranked list.
//!
//! Pure functions: given candidates, the identity's held stamps and a random
//! source, produce the order in which tasks would be served. `offset` then
//! indexes into that order.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::{SchedulingPolicy, Task, TaskId};
use crate::ports::TaskOrder;

/// Store-side order a policy wants its candidates in.
pub fn store_order(policy: SchedulingPolicy) -> TaskOrder {
    match policy {
        SchedulingPolicy::Priority => TaskOrder::PriorityDesc,
        SchedulingPolicy::Default | SchedulingPolicy::Random | SchedulingPolicy::Locked => {
            TaskOrder::IdAsc
        }
    }
}

/// Does the policy keep tasks the identity already holds in the candidate set?
pub fn keeps_stamped(policy: SchedulingPolicy) -> bool {
    matches!(policy, SchedulingPolicy::Locked)
}

/// Rank candidates for `policy`.
///
/// - Default: ascending id.
/// - Priority: descending priority, then ascending id.
/// - Random: a uniform permutation drawn from `rng`.
/// - Locked: tasks in `held` first (ascending id), then the rest by id.
pub fn rank<R: Rng + ?Sized>(
    policy: SchedulingPolicy,
    mut candidates: Vec<Task>,
    held: &HashSet<TaskId>,
    rng: &mut R,
) -> Vec<Task> {
    match policy {
        SchedulingPolicy::Default => candidates.sort_by_key(|t| t.id),
        SchedulingPolicy::Priority => candidates.sort_by(Task::priority_order),
        SchedulingPolicy::Random => {
            candidates.sort_by_key(|t| t.id);
            candidates.shuffle(rng);
        }
        SchedulingPolicy::Locked => candidates.sort_by_key(|t| (!held.contains(&t.id), t.id)),
    }
    candidates
}

/// Rank and skip `offset` entries.
pub fn select<R: Rng + ?Sized>(
    policy: SchedulingPolicy,
    candidates: Vec<Task>,
    held: &HashSet<TaskId>,
    offset: usize,
    rng: &mut R,
) -> Option<Task> {
    rank(policy, candidates, held, rng).into_iter().nth(offset)
}
