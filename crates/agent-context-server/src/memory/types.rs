use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Tool,
}

impl TurnRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a thread's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    /// Stable per-message id, used for idempotent upserts when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            message_id: None,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Cheap text form stored next to the payload for scanning.
    pub fn plain_text(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Persisted row for a single turn.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TurnRecord {
    pub record_key: String,
    pub thread_key: String,
    pub sequence_timestamp_millis: i64,
    pub serialized_payload: String,
    pub plain_text: String,
}

impl TurnRecord {
    /// `"{thread_key}:{message_id}"`, or `"{thread_key}:{sequence}"` without an id.
    pub fn record_key_for(thread_key: &str, turn: &ChatTurn, sequence: i64) -> String {
        match turn.message_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(message_id) => format!("{}:{}", thread_key, message_id),
            None => format!("{}:{}", thread_key, sequence),
        }
    }

    pub fn from_turn(
        thread_key: &str,
        turn: &ChatTurn,
        sequence_timestamp_millis: i64,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            record_key: Self::record_key_for(thread_key, turn, sequence_timestamp_millis),
            thread_key: thread_key.to_string(),
            sequence_timestamp_millis,
            serialized_payload: serde_json::to_string(turn)?,
            plain_text: turn.plain_text(),
        })
    }

    pub fn to_turn(&self) -> Result<ChatTurn, serde_json::Error> {
        serde_json::from_str(&self.serialized_payload)
    }
}
