use axum::extract::FromRef;
use std::sync::Arc;

use crate::identity::SignatureCodec;
use crate::memory::ConversationMemoryStore;
use crate::services::{ConversationLog, ConversationService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub codec: SignatureCodec,
    /// Key required by the mint endpoint; minting is off when unset
    pub mint_api_key: Option<Arc<str>>,
    pub memory: ConversationMemoryStore,
    pub conversation_log: Arc<dyn ConversationLog>,
    pub conversation_service: Arc<ConversationService>,
}

impl FromRef<AppState> for ConversationMemoryStore {
    fn from_ref(state: &AppState) -> Self {
        state.memory.clone()
    }
}

impl FromRef<AppState> for Arc<ConversationService> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ConversationLog> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_log.clone()
    }
}
