//! Ports - abstraction layer.
//!
//! Each trait is the seam to an external collaborator (relational store,
//! key-value store with TTLs, time). The scheduler only talks to these.

pub mod answer_store;
pub mod clock;
pub mod error;
pub mod project_store;
pub mod stamp_store;
pub mod task_store;

pub use self::answer_store::AnswerStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::error::StoreError;
pub use self::project_store::ProjectStore;
pub use self::stamp_store::{Stamp, StampKey, StampStore};
pub use self::task_store::{EligibleQuery, TaskOrder, TaskStore};
