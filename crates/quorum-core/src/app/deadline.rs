//! Bounded store calls.

use std::future::Future;
use std::time::Duration;

use crate::domain::{QuorumError, Result};
use crate::ports::StoreError;

/// Run a store call with a timeout. Expiry and store failures both surface as
/// typed `QuorumError`s (expiry as `Unavailable`).
pub(crate) async fn bounded<T, F>(timeout: Duration, op: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(QuorumError::from),
        Err(_) => {
            tracing::warn!(op, ?timeout, "store call timed out");
            Err(QuorumError::Unavailable(format!(
                "{op} timed out after {timeout:?}"
            )))
        }
    }
}
