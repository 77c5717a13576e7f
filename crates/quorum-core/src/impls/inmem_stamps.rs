//! InMemoryStampStore - expiring reservations in process memory.
//!
//! Expired entries of every identity are swept whenever any identity's stamps
//! are read, so abandoned reservations do not accumulate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::Identity;
use crate::ports::{Stamp, StampKey, StampStore, StoreError};

#[derive(Default)]
pub struct InMemoryStampStore {
    stamps: Arc<Mutex<HashMap<StampKey, DateTime<Utc>>>>,
}

impl InMemoryStampStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.stamps.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stamps.lock().await.is_empty()
    }
}

#[async_trait]
impl StampStore for InMemoryStampStore {
    async fn put(&self, key: StampKey, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.stamps.lock().await.insert(key, expires_at);
        Ok(())
    }

    async fn get(&self, key: &StampKey) -> Result<Option<Stamp>, StoreError> {
        let stamps = self.stamps.lock().await;
        Ok(stamps.get(key).map(|&expires_at| Stamp {
            key: *key,
            expires_at,
        }))
    }

    async fn remove(&self, key: &StampKey) -> Result<(), StoreError> {
        self.stamps.lock().await.remove(key);
        Ok(())
    }

    async fn active_for(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Vec<Stamp>, StoreError> {
        let mut stamps = self.stamps.lock().await;
        stamps.retain(|_, expires_at| *expires_at > now);
        Ok(stamps
            .iter()
            .filter(|(key, _)| key.identity == *identity)
            .map(|(key, &expires_at)| Stamp {
                key: *key,
                expires_at,
            })
            .collect())
    }
}
