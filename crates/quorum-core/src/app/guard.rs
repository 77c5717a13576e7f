//! ContributionGuard - best-effort "just handed out" reservations.
//!
//! A stamp keeps the scheduler from re-issuing a task to the same identity
//! while their answer is still in flight. Every failure of the stamp store is
//! logged and swallowed: without a guard a task may be served twice, and the
//! answer store's uniqueness check still rejects the second answer.
//!
//! # Lifecycle
//! - `stamp` when a task is about to be delivered; re-stamping refreshes the TTL
//! - `active_stamps` / `is_stamped` while the identity asks for more work
//! - `release` once the identity's answer is recorded, or let the TTL lapse
//!
//! # Scope
//! Stamps are keyed by (task, identity). One identity's stamp never hides a
//! task from anyone else.
//!
//! # Timeouts
//! Each stamp store call gets `guard_timeout`. On expiry the call is treated
//! like a store failure: logged at `warn`, then ignored.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Identity, Task, TaskId};
use crate::ports::{Clock, StampKey, StampStore, StoreError};

pub struct ContributionGuard {
    store: Arc<dyn StampStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    timeout: Duration,
}

impl ContributionGuard {
    pub fn new(
        store: Arc<dyn StampStore>,
        clock: Arc<dyn Clock>,
        ttl: chrono::Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            ttl,
            timeout,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Record that `task` was just handed to `identity`. Re-stamping refreshes
    /// the expiry.
    pub async fn stamp(&self, task: &Task, identity: &Identity) {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        let key = StampKey::new(task.id, *identity);
        if self
            .attempt("stamp", self.store.put(key, expires_at))
            .await
            .is_some()
        {
            tracing::debug!(task = %task.id, %identity, %expires_at, "stamped");
        }
    }

    /// Point-in-time check; `false` when the store cannot answer.
    pub async fn is_stamped(&self, task_id: TaskId, identity: &Identity) -> bool {
        let key = StampKey::new(task_id, *identity);
        let now = self.clock.now();
        self.attempt("is_stamped", self.store.get(&key))
            .await
            .flatten()
            .is_some_and(|stamp| stamp.is_active(now))
    }

    /// Tasks currently reserved for `identity`, ascending by id. Empty when the
    /// store cannot answer.
    pub async fn active_stamps(&self, identity: &Identity) -> Vec<TaskId> {
        let now = self.clock.now();
        let mut ids: Vec<TaskId> = self
            .attempt("active_stamps", self.store.active_for(identity, now))
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|stamp| stamp.is_active(now))
            .map(|stamp| stamp.key.task_id)
            .collect();
        ids.sort();
        ids
    }

    /// Drop the reservation once the identity's answer is recorded.
    pub async fn release(&self, task_id: TaskId, identity: &Identity) {
        let key = StampKey::new(task_id, *identity);
        self.attempt("release", self.store.remove(&key)).await;
    }

    async fn attempt<T, F>(&self, op: &'static str, fut: F) -> Option<T>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Some(v),
            Ok(Err(err)) => {
                tracing::warn!(op, error = %err, "contribution guard degraded");
                None
            }
            Err(_) => {
                tracing::warn!(op, timeout = ?self.timeout, "contribution guard timed out");
                None
            }
        }
    }
}
