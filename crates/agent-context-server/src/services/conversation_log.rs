use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::utils::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Customer,
    Seller,
}

impl Sender {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "customer" => Some(Self::Customer),
            "seller" => Some(Self::Seller),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Customer => "Customer",
            Self::Seller => "Seller",
        }
    }
}

/// One approved customer/seller message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationLogEntry {
    pub conversation_id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ConversationLogEntry {
    pub fn new(conversation_id: impl Into<String>, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Long-lived customer/seller conversation record, read in full.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationLog: Send + Sync {
    /// Every entry of the conversation, oldest first.
    async fn entries(&self, conversation_id: &str) -> Result<Vec<ConversationLogEntry>, StoreError>;

    async fn record(&self, entry: ConversationLogEntry) -> Result<(), StoreError>;

    /// Remove the whole conversation, returning how many entries went away.
    async fn clear(&self, conversation_id: &str) -> Result<u64, StoreError>;
}

#[derive(Default)]
pub struct InMemoryConversationLog {
    conversations: DashMap<String, Vec<ConversationLogEntry>>,
}

impl InMemoryConversationLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationLog for InMemoryConversationLog {
    async fn entries(&self, conversation_id: &str) -> Result<Vec<ConversationLogEntry>, StoreError> {
        let mut entries = self
            .conversations
            .get(conversation_id)
            .map(|entries| entries.clone())
            .unwrap_or_default();

        // Stable: equal timestamps keep insertion order
        entries.sort_by_key(|entry| entry.timestamp);
        Ok(entries)
    }

    async fn record(&self, entry: ConversationLogEntry) -> Result<(), StoreError> {
        self.conversations
            .entry(entry.conversation_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .conversations
            .remove(conversation_id)
            .map(|(_, entries)| entries.len() as u64)
            .unwrap_or(0))
    }
}
