//! quorum-core
//!
//! Task scheduling for crowdsourcing projects: decide which task an identity
//! works on next, keep an identity from being credited twice, and track
//! progress toward each task's redundancy target.
//!
//! # Modules
//! - **domain**: records and typed outcomes (ids, identity, task, answer, project, policy, errors)
//! - **ports**: store and clock traits
//! - **impls**: in-memory stores
//! - **app**: scheduler, guard, recorder, progress counter, builder

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{App, AppBuilder, NextTaskRequest, SchedulerConfig};
pub use domain::{Assignment, Identity, QuorumError};
