use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, info};

use super::DbPool;
use crate::services::conversation_log::{ConversationLog, ConversationLogEntry, Sender};
use crate::utils::error::StoreError;

/// `conversation_log_entries` table access.
pub struct PgConversationLogRepository {
    pool: DbPool,
}

impl PgConversationLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationLog for PgConversationLogRepository {
    async fn entries(&self, conversation_id: &str) -> Result<Vec<ConversationLogEntry>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT conversation_id, sender, content, "timestamp", display_name
               FROM conversation_log_entries
               WHERE conversation_id = $1
               ORDER BY "timestamp" ASC, id ASC"#,
        )
        .bind(conversation_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let sender: String = row.try_get("sender")?;
            let sender = Sender::parse(&sender)
                .ok_or_else(|| StoreError::CorruptRecord(format!("unknown sender {:?}", sender)))?;
            let timestamp: DateTime<Utc> = row.try_get("timestamp")?;

            entries.push(ConversationLogEntry {
                conversation_id: row.try_get("conversation_id")?,
                sender,
                content: row.try_get("content")?,
                timestamp,
                display_name: row.try_get("display_name")?,
            });
        }

        debug!("Loaded {} log entries for conversation {}", entries.len(), conversation_id);
        Ok(entries)
    }

    async fn record(&self, entry: ConversationLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO conversation_log_entries
                (conversation_id, sender, content, "timestamp", display_name)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&entry.conversation_id)
        .bind(entry.sender.as_str())
        .bind(&entry.content)
        .bind(entry.timestamp)
        .bind(&entry.display_name)
        .execute(self.pool.get_pool())
        .await?;

        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM conversation_log_entries WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(self.pool.get_pool())
            .await?;

        info!(
            "Cleared {} log entries for conversation {}",
            result.rows_affected(),
            conversation_id
        );
        Ok(result.rows_affected())
    }
}
