use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::models::{
    A2aPart, A2aRequest, A2aResponse, A2aResult, A2aResultMetadata, AgentChatRequest,
    AgentChatResponse,
};
use crate::security::RequestContext;
use crate::services::{ConversationService, TurnInput};
use crate::utils::error::ApiError;

const A2A_SEND_METHOD: &str = "message/send";

/// Direct REST entry point (flat body shape).
pub async fn agent_chat_handler(
    State(service): State<Arc<ConversationService>>,
    Path(agent): Path<String>,
    Extension(context): Extension<RequestContext>,
    Json(request): Json<AgentChatRequest>,
) -> Result<Json<AgentChatResponse>, ApiError> {
    debug!(
        "Agent chat: agent={}, context={}, message_len={}",
        agent,
        context.context_id,
        request.message.len()
    );

    let outcome = service
        .handle_turn(
            &context,
            TurnInput {
                agent,
                message: request.message,
                message_id: request.message_id,
                conversation_id: request.conversation_id,
                display_name: request.display_name,
            },
        )
        .await?;

    Ok(Json(AgentChatResponse {
        context_id: outcome.context_id,
        is_new_context: outcome.is_new_context,
        reply: outcome.reply,
        suppress_secondary_tool: outcome.suppress_secondary_tool,
    }))
}

/// A2A-style JSON-RPC entry point (nested body shape).
pub async fn a2a_handler(
    State(service): State<Arc<ConversationService>>,
    Path(agent): Path<String>,
    Extension(context): Extension<RequestContext>,
    Json(request): Json<A2aRequest>,
) -> Result<Json<A2aResponse>, ApiError> {
    if request.method != A2A_SEND_METHOD {
        return Err(ApiError::BadRequest(format!(
            "Unsupported method: {}",
            request.method
        )));
    }

    if let Some(version) = request.jsonrpc.as_deref() {
        if version != "2.0" {
            return Err(ApiError::BadRequest(format!(
                "Unsupported jsonrpc version: {}",
                version
            )));
        }
    }

    let metadata = request.params.metadata.unwrap_or_default();
    let outcome = service
        .handle_turn(
            &context,
            TurnInput {
                agent,
                message: request.params.message.text(),
                message_id: request.params.message.message_id,
                conversation_id: metadata.conversation_id,
                display_name: metadata.display_name,
            },
        )
        .await?;

    Ok(Json(A2aResponse {
        jsonrpc: "2.0",
        id: request.id,
        result: A2aResult {
            kind: "message",
            role: "agent",
            message_id: outcome.reply_message_id,
            context_id: outcome.context_id,
            parts: vec![A2aPart {
                kind: Some("text".to_string()),
                text: Some(outcome.reply),
            }],
            metadata: A2aResultMetadata {
                is_new_context: outcome.is_new_context,
                suppress_secondary_tool: outcome.suppress_secondary_tool,
            },
        },
    }))
}
