//! App - orchestration over the ports.
//!
//! - **AppBuilder / App**: wiring and the operation surface
//! - **Scheduler**: read-only task selection
//! - **ContributionGuard**: best-effort per-identity reservations
//! - **AnswerRecorder**: answer insertion and task state transitions
//! - **ProgressCounter**: answer counts and cached progress figures

pub mod builder;
pub mod config;
mod deadline;
pub mod guard;
pub mod ordering;
pub mod progress;
pub mod recorder;
pub mod scheduler;
pub mod service;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::config::SchedulerConfig;
pub use self::guard::ContributionGuard;
pub use self::progress::{ProgressCache, ProgressCounter};
pub use self::recorder::AnswerRecorder;
pub use self::scheduler::{NextTaskRequest, Scheduler};
pub use self::service::Purged;
