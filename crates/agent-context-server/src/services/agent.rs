use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::AgentConfig;
use crate::memory::{ChatTurn, TurnRole};
use crate::utils::error::ApiError;

/// Everything an agent needs for one stateless call.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub agent: String,
    /// Recent turns of the thread, oldest first
    pub history: Vec<ChatTurn>,
    pub contextualized_message: String,
    pub suppress_secondary_tool: bool,
}

/// Executes one agent turn. The LLM call itself lives behind this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, request: AgentRequest) -> Result<String, ApiError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: CompletionMessage,
}

const SECONDARY_TOOL_NOTE: &str = "This customer already has conversation history. \
Do not run first-contact tools such as welcome offers or onboarding lookups.";

/// Agent backed by an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiCompatibleAgent {
    client: Client,
    config: AgentConfig,
}

impl OpenAiCompatibleAgent {
    pub fn new(config: AgentConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// System prompt, replayed history, then the contextualized message.
    pub fn build_messages(&self, request: &AgentRequest) -> Vec<CompletionMessage> {
        let mut system_prompt = self.config.system_prompt.clone();
        if request.suppress_secondary_tool {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(SECONDARY_TOOL_NOTE);
        }

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(CompletionMessage {
            role: TurnRole::System.to_string(),
            content: system_prompt,
        });

        messages.extend(
            request
                .history
                .iter()
                .filter(|turn| matches!(turn.role, TurnRole::User | TurnRole::Assistant))
                .map(|turn| CompletionMessage {
                    role: turn.role.to_string(),
                    content: turn.content.clone(),
                }),
        );

        messages.push(CompletionMessage {
            role: TurnRole::User.to_string(),
            content: request.contextualized_message.clone(),
        });

        messages
    }
}

#[async_trait]
impl AgentExecutor for OpenAiCompatibleAgent {
    async fn execute(&self, request: AgentRequest) -> Result<String, ApiError> {
        let messages = self.build_messages(&request);
        debug!(
            "Calling agent {} with {} messages",
            request.agent,
            messages.len()
        );

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: 0.7,
            stream: false,
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::AgentError(format!("Failed to call agent backend: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::AgentError(format!(
                "Agent backend error: {} - {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::AgentError(format!("Failed to parse agent response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ApiError::AgentError("No choices returned from agent backend".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> AgentConfig {
        AgentConfig {
            base_url: base_url.to_string(),
            model: "test-model".to_string(),
            timeout_seconds: 5,
            max_tokens: 128,
            system_prompt: "You are a sales assistant.".to_string(),
        }
    }

    fn request(suppress: bool) -> AgentRequest {
        AgentRequest {
            agent: "sales".to_string(),
            history: vec![
                ChatTurn::user("Hi"),
                ChatTurn::new(TurnRole::Tool, "lookup result"),
                ChatTurn::assistant("Hello!"),
            ],
            contextualized_message: "[CUSTOMER: Client]\n\nWhat about shipping?".to_string(),
            suppress_secondary_tool: suppress,
        }
    }

    #[test]
    fn test_build_messages_replays_history() {
        let agent = OpenAiCompatibleAgent::new(config("http://localhost")).unwrap();
        let messages = agent.build_messages(&request(false));

        let roles: Vec<_> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content, "You are a sales assistant.");
        assert!(messages[3].content.contains("What about shipping?"));
    }

    #[test]
    fn test_build_messages_adds_suppression_note() {
        let agent = OpenAiCompatibleAgent::new(config("http://localhost")).unwrap();
        let messages = agent.build_messages(&request(true));
        assert!(messages[0].content.ends_with(SECONDARY_TOOL_NOTE));
    }

    #[tokio::test]
    async fn test_execute_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "Ships in 3 days." } }]
            })))
            .mount(&server)
            .await;

        let agent = OpenAiCompatibleAgent::new(config(&server.uri())).unwrap();
        let reply = agent.execute(request(false)).await.unwrap();
        assert_eq!(reply, "Ships in 3 days.");
    }

    #[tokio::test]
    async fn test_execute_maps_backend_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let agent = OpenAiCompatibleAgent::new(config(&server.uri())).unwrap();
        let err = agent.execute(request(false)).await.unwrap_err();
        assert!(matches!(err, ApiError::AgentError(_)));
    }
}
