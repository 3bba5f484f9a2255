use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;

use super::repository::TurnRepository;
use super::types::TurnRecord;
use crate::utils::error::StoreError;

/// DashMap-backed turn storage for development and tests.
///
/// Records are partitioned by thread key; a batch targeting one thread is
/// applied under that thread's shard lock.
#[derive(Default)]
pub struct InMemoryTurnRepository {
    threads: DashMap<String, HashMap<String, TurnRecord>>,
}

impl InMemoryTurnRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}

#[async_trait]
impl TurnRepository for InMemoryTurnRepository {
    async fn fetch_latest(
        &self,
        thread_key: &str,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, StoreError> {
        let Some(thread) = self.threads.get(thread_key) else {
            return Ok(Vec::new());
        };

        let mut records: Vec<TurnRecord> = thread.values().cloned().collect();
        drop(thread);

        records.sort_by(|a, b| b.sequence_timestamp_millis.cmp(&a.sequence_timestamp_millis));
        records.truncate(limit);

        Ok(records)
    }

    async fn upsert_batch(&self, records: Vec<TurnRecord>) -> Result<(), StoreError> {
        let mut by_thread: HashMap<String, Vec<TurnRecord>> = HashMap::new();
        for record in records {
            by_thread
                .entry(record.thread_key.clone())
                .or_default()
                .push(record);
        }

        for (thread_key, records) in by_thread {
            let mut thread = self.threads.entry(thread_key.clone()).or_default();
            let count = records.len();
            for record in records {
                thread.insert(record.record_key.clone(), record);
            }
            debug!("Upserted {} turns into in-memory thread {}", count, thread_key);
        }

        Ok(())
    }

    async fn count(&self, thread_key: &str) -> Result<u64, StoreError> {
        Ok(self
            .threads
            .get(thread_key)
            .map(|thread| thread.len() as u64)
            .unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(thread: &str, key: &str, seq: i64) -> TurnRecord {
        TurnRecord {
            record_key: format!("{}:{}", thread, key),
            thread_key: thread.to_string(),
            sequence_timestamp_millis: seq,
            serialized_payload: "{}".to_string(),
            plain_text: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_latest_is_newest_first() {
        let repo = InMemoryTurnRepository::new();
        repo.upsert_batch(vec![record("t", "a", 1), record("t", "b", 3), record("t", "c", 2)])
            .await
            .unwrap();

        let latest = repo.fetch_latest("t", 2).await.unwrap();
        let keys: Vec<_> = latest.iter().map(|r| r.plain_text.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let repo = InMemoryTurnRepository::new();
        repo.upsert_batch(vec![record("t1", "a", 1), record("t2", "b", 2)])
            .await
            .unwrap();

        assert_eq!(repo.count("t1").await.unwrap(), 1);
        assert_eq!(repo.count("t2").await.unwrap(), 1);
        assert_eq!(repo.count("missing").await.unwrap(), 0);
        assert_eq!(repo.thread_count(), 2);
    }
}
