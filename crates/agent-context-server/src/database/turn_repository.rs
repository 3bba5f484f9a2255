use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use super::DbPool;
use crate::memory::{TurnRecord, TurnRepository};
use crate::utils::error::StoreError;

/// `conversation_turns` table access.
pub struct PgTurnRepository {
    pool: DbPool,
}

impl PgTurnRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Last write wins for duplicate `(thread_key, record_key)` rows inside one
/// batch; Postgres refuses to touch the same row twice in a single
/// `ON CONFLICT` statement.
fn dedup_by_row_key(records: Vec<TurnRecord>) -> Vec<TurnRecord> {
    let mut last_index: HashMap<(String, String), usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        last_index.insert(row_key(record), idx);
    }

    records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| last_index.get(&row_key(record)) == Some(idx))
        .map(|(_, record)| record)
        .collect()
}

fn row_key(record: &TurnRecord) -> (String, String) {
    (record.thread_key.clone(), record.record_key.clone())
}

#[async_trait]
impl TurnRepository for PgTurnRepository {
    async fn fetch_latest(
        &self,
        thread_key: &str,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, StoreError> {
        let records = sqlx::query_as::<_, TurnRecord>(
            r#"SELECT
                record_key,
                thread_key,
                sequence_timestamp_millis,
                serialized_payload,
                plain_text
               FROM conversation_turns
               WHERE thread_key = $1
               ORDER BY sequence_timestamp_millis DESC
               LIMIT $2"#,
        )
        .bind(thread_key)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool.get_pool())
        .await?;

        debug!("Fetched {} turns for thread {}", records.len(), thread_key);
        Ok(records)
    }

    async fn upsert_batch(&self, records: Vec<TurnRecord>) -> Result<(), StoreError> {
        let records = dedup_by_row_key(records);
        if records.is_empty() {
            return Ok(());
        }

        // One multi-row statement: the whole batch lands or none of it does
        let mut query_builder = sqlx::QueryBuilder::new(
            r#"
            INSERT INTO conversation_turns (
                record_key, thread_key, sequence_timestamp_millis,
                serialized_payload, plain_text
            )
            "#,
        );

        query_builder.push_values(&records, |mut b, record| {
            b.push_bind(&record.record_key)
                .push_bind(&record.thread_key)
                .push_bind(record.sequence_timestamp_millis)
                .push_bind(&record.serialized_payload)
                .push_bind(&record.plain_text);
        });

        query_builder.push(
            r#"
            ON CONFLICT (thread_key, record_key) DO UPDATE SET
                sequence_timestamp_millis = EXCLUDED.sequence_timestamp_millis,
                serialized_payload = EXCLUDED.serialized_payload,
                plain_text = EXCLUDED.plain_text
            "#,
        );

        let result = query_builder.build().execute(self.pool.get_pool()).await?;
        debug!("Upserted {} turn records", result.rows_affected());

        Ok(())
    }

    async fn count(&self, thread_key: &str) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM conversation_turns WHERE thread_key = $1",
        )
        .bind(thread_key)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.pool.get_pool()).await?;
        Ok(())
    }
}
