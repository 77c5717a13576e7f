//! Domain model: ids, identities, tasks, answers, projects, policies, outcomes.

pub mod errors;
pub mod identity;
pub mod ids;
pub mod outcome;
pub mod policy;
pub mod progress;
pub mod project;
pub mod state;
pub mod task;
pub mod task_run;

pub use self::errors::{ErrorKind, QuorumError, Result};
pub use self::identity::Identity;
pub use self::ids::{ProjectId, TaskId, TaskRunId, UserId};
pub use self::outcome::Assignment;
pub use self::policy::SchedulingPolicy;
pub use self::progress::Progress;
pub use self::project::{Project, ProjectInfo};
pub use self::state::TaskState;
pub use self::task::{DEFAULT_N_ANSWERS, NewTask, Task};
pub use self::task_run::{NewTaskRun, TaskRun};
