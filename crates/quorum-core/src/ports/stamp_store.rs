//! StampStore port - ephemeral "task handed to identity" reservations.
//!
//! Entries carry their own expiry. Nothing here references the task or answer
//! stores; losing every stamp only means a task may be re-served.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::domain::{Identity, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StampKey {
    pub task_id: TaskId,
    pub identity: Identity,
}

impl StampKey {
    pub fn new(task_id: TaskId, identity: Identity) -> Self {
        Self { task_id, identity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub key: StampKey,
    pub expires_at: DateTime<Utc>,
}

impl Stamp {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[async_trait]
pub trait StampStore: Send + Sync {
    /// Insert or overwrite; one entry per key.
    async fn put(&self, key: StampKey, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn get(&self, key: &StampKey) -> Result<Option<Stamp>, StoreError>;

    async fn remove(&self, key: &StampKey) -> Result<(), StoreError>;

    /// Unexpired stamps held by `identity` at `now`.
    async fn active_for(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Vec<Stamp>, StoreError>;
}
