use serde::{Deserialize, Serialize};

// ===== REST (flat shape) =====

/// `POST /api/agents/{agent}/chat`. `contextId`/`signature` are consumed by
/// the context middleware and not repeated here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentChatRequest {
    pub message: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentChatResponse {
    pub context_id: String,
    pub is_new_context: bool,
    pub reply: String,
    pub suppress_secondary_tool: bool,
}

// ===== A2A (nested shape) =====

#[derive(Debug, Deserialize)]
pub struct A2aRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub method: String,
    pub params: A2aParams,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aParams {
    pub message: A2aMessage,
    #[serde(default)]
    pub metadata: Option<A2aMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aMessage {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub parts: Vec<A2aPart>,
}

impl A2aMessage {
    /// Text parts joined by newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct A2aPart {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aMetadata {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct A2aResponse {
    pub jsonrpc: &'static str,
    pub id: Option<serde_json::Value>,
    pub result: A2aResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aResult {
    pub kind: &'static str,
    pub role: &'static str,
    pub message_id: String,
    pub context_id: String,
    pub parts: Vec<A2aPart>,
    pub metadata: A2aResultMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aResultMetadata {
    pub is_new_context: bool,
    pub suppress_secondary_tool: bool,
}

// ===== Context minting =====

#[derive(Debug, Deserialize)]
pub struct MintContextRequest {
    pub subject: String,
}

// ===== Conversation log =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordLogEntryRequest {
    pub sender: crate::services::Sender,
    pub content: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearLogResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct TurnsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}
