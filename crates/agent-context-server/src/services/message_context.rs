use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::conversation_log::{ConversationLog, ConversationLogEntry};
use crate::memory::ConversationMemoryStore;
use crate::utils::error::StoreError;

pub const DEFAULT_DISPLAY_NAME: &str = "Client";

pub const FIRST_INTERACTION_MARKER: &str =
    "[FIRST INTERACTION] Greet the customer and introduce yourself.";
pub const IN_PROGRESS_MARKER: &str =
    "[INTERACTION IN PROGRESS] Do not introduce yourself again.";
pub const HISTORY_START: &str = "--- CONVERSATION HISTORY ---";
pub const HISTORY_END: &str = "--- END OF HISTORY ---";
pub const FOLLOW_UP_MARKER: &str =
    "[FOLLOW-UP] Previous conversation history is available above.";
pub const NO_HISTORY_MARKER: &str =
    "[NO HISTORY] This is the first message of the conversation.";
pub const MESSAGE_DELIMITER: &str = "--- CUSTOMER MESSAGE ---";

/// Answers "has this thread seen any turns yet?".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThreadMessages: Send + Sync {
    async fn count_turns(&self, thread_key: &str) -> Result<u64, StoreError>;
}

#[async_trait]
impl ThreadMessages for ConversationMemoryStore {
    async fn count_turns(&self, thread_key: &str) -> Result<u64, StoreError> {
        ConversationMemoryStore::count_turns(self, thread_key).await
    }
}

/// Prompt text handed to the agent plus the tool-suppression hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    pub contextualized_message: String,
    pub suppress_secondary_tool: bool,
    pub first_interaction: bool,
}

pub struct MessageContextBuilder {
    thread_messages: Arc<dyn ThreadMessages>,
    conversation_log: Arc<dyn ConversationLog>,
}

impl MessageContextBuilder {
    pub fn new(
        thread_messages: Arc<dyn ThreadMessages>,
        conversation_log: Arc<dyn ConversationLog>,
    ) -> Self {
        Self {
            thread_messages,
            conversation_log,
        }
    }

    /// Compose the outbound prompt.
    ///
    /// Sections always appear in this order: customer header, interaction
    /// marker, history block (or its absence marker), message footer.
    pub async fn build(
        &self,
        message: &str,
        thread_key: &str,
        conversation_id: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<MessageContext, StoreError> {
        // 1. First interaction = no turns stored for the thread yet
        let existing = self.thread_messages.count_turns(thread_key).await?;
        let first_interaction = existing == 0;

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME);

        let mut sections = vec![
            // 2. Header
            format!("[CUSTOMER: {}]", display_name),
            // 3. Interaction marker
            if first_interaction {
                FIRST_INTERACTION_MARKER.to_string()
            } else {
                IN_PROGRESS_MARKER.to_string()
            },
        ];

        // 4. Customer/seller history
        let mut suppress_secondary_tool = false;
        if let Some(conversation_id) = conversation_id.filter(|id| !id.trim().is_empty()) {
            let entries = self.conversation_log.entries(conversation_id).await?;
            let history = render_history(&entries);

            if history.is_empty() {
                sections.push(NO_HISTORY_MARKER.to_string());
            } else {
                info!(
                    "Injecting {} history entries for conversation {}",
                    entries.len(),
                    conversation_id
                );
                sections.push(history);
                sections.push(FOLLOW_UP_MARKER.to_string());
                suppress_secondary_tool = true;
            }
        }

        // 5. Raw message
        sections.push(format!("{}\n{}", MESSAGE_DELIMITER, message));

        debug!(
            "Built message context: thread={}, first_interaction={}, suppress_secondary_tool={}",
            thread_key, first_interaction, suppress_secondary_tool
        );

        Ok(MessageContext {
            contextualized_message: sections.join("\n\n"),
            suppress_secondary_tool,
            first_interaction,
        })
    }
}

/// Delimited block with one line per entry; empty when there is nothing to show.
fn render_history(entries: &[ConversationLogEntry]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .filter(|entry| !entry.content.trim().is_empty())
        .map(|entry| {
            let who = match entry.display_name.as_deref() {
                Some(name) if !name.trim().is_empty() => {
                    format!("{} ({})", entry.sender.label(), name.trim())
                }
                _ => entry.sender.label().to_string(),
            };
            format!(
                "[{}] {}: {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                who,
                entry.content.trim()
            )
        })
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    format!("{}\n{}\n{}", HISTORY_START, lines.join("\n"), HISTORY_END)
}
