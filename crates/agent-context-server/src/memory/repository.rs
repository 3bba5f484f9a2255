use async_trait::async_trait;

use super::types::TurnRecord;
use crate::utils::error::StoreError;

/// Backing persistence for conversation turns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TurnRepository: Send + Sync {
    /// Up to `limit` records for the thread, newest first.
    async fn fetch_latest(
        &self,
        thread_key: &str,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, StoreError>;

    /// Insert-or-replace every record by `record_key`, all or nothing.
    async fn upsert_batch(&self, records: Vec<TurnRecord>) -> Result<(), StoreError>;

    async fn count(&self, thread_key: &str) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
