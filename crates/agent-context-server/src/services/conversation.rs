use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::agent::{AgentExecutor, AgentRequest};
use super::message_context::MessageContextBuilder;
use crate::memory::{ChatTurn, ConversationMemoryStore};
use crate::security::RequestContext;
use crate::utils::error::ApiError;

/// One inbound user message, already tied to a thread by the middleware.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub agent: String,
    pub message: String,
    pub message_id: Option<String>,
    pub conversation_id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub context_id: String,
    pub is_new_context: bool,
    pub reply: String,
    pub reply_message_id: String,
    pub suppress_secondary_tool: bool,
}

/// Runs a single stateless agent turn:
/// compose prompt → replay window → execute → persist user + reply.
pub struct ConversationService {
    memory: ConversationMemoryStore,
    context_builder: MessageContextBuilder,
    agent: Arc<dyn AgentExecutor>,
}

impl ConversationService {
    pub fn new(
        memory: ConversationMemoryStore,
        context_builder: MessageContextBuilder,
        agent: Arc<dyn AgentExecutor>,
    ) -> Self {
        Self {
            memory,
            context_builder,
            agent,
        }
    }

    pub async fn handle_turn(
        &self,
        context: &RequestContext,
        input: TurnInput,
    ) -> Result<TurnOutcome, ApiError> {
        let start_time = Instant::now();

        if input.message.trim().is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".to_string()));
        }

        let thread = self.memory.thread(Some(context.context_id.clone()));

        // Before persisting anything, so first-interaction detection sees the prior state
        let message_context = self
            .context_builder
            .build(
                &input.message,
                thread.thread_key(),
                input.conversation_id.as_deref(),
                input.display_name.as_deref(),
            )
            .await?;

        let history = thread.load_window().await?;

        let reply = self
            .agent
            .execute(AgentRequest {
                agent: input.agent.clone(),
                history,
                contextualized_message: message_context.contextualized_message,
                suppress_secondary_tool: message_context.suppress_secondary_tool,
            })
            .await?;

        let reply_message_id = uuid::Uuid::new_v4().to_string();
        let mut user_turn = ChatTurn::user(input.message);
        user_turn.message_id = input.message_id;
        let reply_turn = ChatTurn::assistant(reply.clone()).with_message_id(reply_message_id.clone());

        thread.append(&[user_turn, reply_turn]).await?;

        info!(
            "Agent {} answered thread {} in {:?} (new={}, first_interaction={})",
            input.agent,
            thread.thread_key(),
            start_time.elapsed(),
            context.is_new,
            message_context.first_interaction
        );

        Ok(TurnOutcome {
            context_id: thread.thread_key().to_string(),
            is_new_context: context.is_new,
            reply,
            reply_message_id,
            suppress_secondary_tool: message_context.suppress_secondary_tool,
        })
    }
}
