use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::identity::{ContextIdentity, SignedContextId};
use crate::memory::{ChatTurn, ConversationMemoryStore};
use crate::models::{ClearLogResponse, MintContextRequest, RecordLogEntryRequest, TurnsQuery};
use crate::services::{ConversationLog, ConversationLogEntry};
use crate::state::AppState;
use crate::utils::error::ApiError;

pub const MINT_API_KEY_HEADER: &str = "X-API-Key";

const MAX_TURNS_PER_READ: usize = 100;

/// Issue a signed contextId for a subject.
///
/// Meant for trusted front-ends only: disabled unless `security.mint_api_key`
/// is configured, and every call must present that key in `X-API-Key`.
pub async fn mint_context_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MintContextRequest>,
) -> Result<Json<SignedContextId>, ApiError> {
    let Some(expected) = state.mint_api_key.as_deref() else {
        return Err(ApiError::Forbidden("Context minting is disabled".to_string()));
    };

    let provided = headers
        .get(MINT_API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", MINT_API_KEY_HEADER)))?;

    // Compared as MACs so the check runs in constant time
    if !state.codec.verify(provided, &state.codec.sign(expected)) {
        warn!("Invalid {} on context mint", MINT_API_KEY_HEADER);
        return Err(ApiError::Unauthorized(format!("Invalid {}", MINT_API_KEY_HEADER)));
    }

    let minted = ContextIdentity::mint(&state.codec, &request.subject)?;
    info!("Minted contextId for subject {}", request.subject);
    Ok(Json(minted))
}

/// Most recent turns of a thread, oldest first.
pub async fn thread_turns_handler(
    State(memory): State<ConversationMemoryStore>,
    Path(thread_key): Path<String>,
    Query(query): Query<TurnsQuery>,
) -> Result<Json<Vec<ChatTurn>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(memory.window_size())
        .clamp(1, MAX_TURNS_PER_READ);

    let turns = memory.load_recent(&thread_key, limit).await?;
    Ok(Json(turns))
}

pub async fn conversation_log_handler(
    State(log): State<Arc<dyn ConversationLog>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<ConversationLogEntry>>, ApiError> {
    Ok(Json(log.entries(&conversation_id).await?))
}

/// Record one approved customer/seller message.
pub async fn record_log_entry_handler(
    State(log): State<Arc<dyn ConversationLog>>,
    Path(conversation_id): Path<String>,
    Json(request): Json<RecordLogEntryRequest>,
) -> Result<(StatusCode, Json<ConversationLogEntry>), ApiError> {
    if request.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content must not be empty".to_string()));
    }

    let mut entry = ConversationLogEntry::new(conversation_id, request.sender, request.content);
    entry.display_name = request.display_name;

    log.record(entry.clone()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn clear_conversation_log_handler(
    State(log): State<Arc<dyn ConversationLog>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ClearLogResponse>, ApiError> {
    let deleted = log.clear(&conversation_id).await?;
    Ok(Json(ClearLogResponse { deleted }))
}
