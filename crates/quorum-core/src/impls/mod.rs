//! Impls - in-memory implementations of every port.
//!
//! Suitable for single-process deployments, tests and the demo binary. A
//! relational task/answer store or a TTL key-value stamp store plugs in behind
//! the same traits.

pub mod inmem_answers;
pub mod inmem_projects;
pub mod inmem_stamps;
pub mod inmem_tasks;

pub use self::inmem_answers::InMemoryAnswerStore;
pub use self::inmem_projects::InMemoryProjectStore;
pub use self::inmem_stamps::InMemoryStampStore;
pub use self::inmem_tasks::InMemoryTaskStore;
