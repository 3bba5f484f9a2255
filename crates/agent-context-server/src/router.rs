use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::security::{context_extraction_middleware, ContextExtractor};
use crate::state::AppState;

pub fn build_router(state: AppState, extractor: Arc<ContextExtractor>, body_limit: usize) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Agent-facing routes, identity resolved by the context middleware
    let agent_routes = Router::new()
        .route(
            "/api/agents/{agent}/chat",
            post(handlers::agent::agent_chat_handler),
        )
        .route("/a2a/{agent}", post(handlers::agent::a2a_handler));

    let context_routes = Router::new()
        .route(
            "/api/context/mint",
            post(handlers::context::mint_context_handler),
        )
        .route(
            "/api/threads/{thread_key}/turns",
            get(handlers::context::thread_turns_handler),
        )
        .route(
            "/api/conversations/{conversation_id}/log",
            get(handlers::context::conversation_log_handler)
                .post(handlers::context::record_log_entry_handler)
                .delete(handlers::context::clear_conversation_log_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(agent_routes)
        .merge(context_routes)
        .layer(middleware::from_fn_with_state(
            extractor,
            context_extraction_middleware,
        ))
        .with_state(state)
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(DefaultBodyLimit::max(body_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::identity::SignatureCodec;
    use crate::memory::{ConversationMemoryStore, InMemoryTurnRepository};
    use crate::services::agent::MockAgentExecutor;
    use crate::services::{
        ConversationLog, ConversationService, InMemoryConversationLog, MessageContextBuilder,
        ThreadMessages,
    };
    use crate::utils::error::ApiError;

    const KEY: &str = "router-test-signing-key-0123456789";
    const MINT_KEY: &str = "router-test-mint-key";

    fn app(agent: MockAgentExecutor) -> Router {
        app_with_mint_key(agent, Some(MINT_KEY))
    }

    fn app_with_mint_key(agent: MockAgentExecutor, mint_api_key: Option<&str>) -> Router {
        let codec = SignatureCodec::new(KEY).unwrap();
        let memory = ConversationMemoryStore::new(Arc::new(InMemoryTurnRepository::new()), 10);
        let conversation_log: Arc<dyn ConversationLog> = Arc::new(InMemoryConversationLog::new());
        let thread_messages: Arc<dyn ThreadMessages> = Arc::new(memory.clone());

        let conversation_service = Arc::new(ConversationService::new(
            memory.clone(),
            MessageContextBuilder::new(thread_messages, conversation_log.clone()),
            Arc::new(agent),
        ));

        let state = AppState {
            codec: codec.clone(),
            mint_api_key: mint_api_key.map(Arc::from),
            memory,
            conversation_log,
            conversation_service,
        };
        let extractor = Arc::new(ContextExtractor::new(
            codec,
            vec!["/a2a".to_string(), "/api/agents".to_string()],
            1024 * 1024,
        ));

        build_router(state, extractor, 1024 * 1024)
    }

    fn echo_agent() -> MockAgentExecutor {
        let mut agent = MockAgentExecutor::new();
        agent
            .expect_execute()
            .returning(|req| Ok(format!("{} saw {} turns", req.agent, req.history.len())));
        agent
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        call_with_headers(app, method, uri, body, &[]).await
    }

    async fn call_with_headers(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(MockAgentExecutor::new());

        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, _) = call(&app, Method::GET, "/health/ready", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_minted_context_continues_thread() {
        let app = app(echo_agent());

        let (status, minted) = call_with_headers(
            &app,
            Method::POST,
            "/api/context/mint",
            Some(json!({ "subject": "alice" })),
            &[("x-api-key", MINT_KEY)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let context_id = minted["contextId"].as_str().unwrap().to_string();
        assert!(context_id.starts_with("alice|"));

        let request = json!({
            "contextId": context_id,
            "signature": minted["signature"],
            "message": "hello",
        });

        let (status, first) = call(&app, Method::POST, "/api/agents/sales/chat", Some(request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["contextId"], context_id.as_str());
        assert_eq!(first["isNewContext"], false);
        assert_eq!(first["reply"], "sales saw 0 turns");

        let (_, second) = call(&app, Method::POST, "/api/agents/sales/chat", Some(request)).await;
        assert_eq!(second["reply"], "sales saw 2 turns");

        let uri = format!("/api/threads/{}/turns?limit=3", context_id.replace('|', "%7C"));
        let (status, turns) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let turns = turns.as_array().unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0]["role"], "assistant");
        assert_eq!(turns[1]["content"], "hello");
        assert_eq!(turns[2]["content"], "sales saw 2 turns");
    }

    #[tokio::test]
    async fn test_mint_requires_configured_api_key() {
        let app = app(MockAgentExecutor::new());
        let body = Some(json!({ "subject": "alice" }));

        let (status, _) = call(&app, Method::POST, "/api/context/mint", body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, minted) = call_with_headers(
            &app,
            Method::POST,
            "/api/context/mint",
            body.clone(),
            &[("x-api-key", "router-test-mint-kez")],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(minted.get("signature").is_none());

        let disabled = app_with_mint_key(MockAgentExecutor::new(), None);
        let (status, _) = call_with_headers(
            &disabled,
            Method::POST,
            "/api/context/mint",
            body,
            &[("x-api-key", MINT_KEY)],
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_forged_signature_never_reaches_agent() {
        let mut agent = MockAgentExecutor::new();
        agent.expect_execute().never();
        let app = app(agent);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/agents/sales/chat",
            Some(json!({ "contextId": "alice|1000", "signature": "bogus", "message": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "error": "Invalid contextId signature" }));
    }

    #[tokio::test]
    async fn test_a2a_message_send() {
        let app = app(echo_agent());

        let (status, body) = call(
            &app,
            Method::POST,
            "/a2a/support",
            Some(json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "message/send",
                "params": {
                    "message": { "messageId": "m-1", "parts": [{ "kind": "text", "text": "where is my order?" }] }
                }
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], 7);
        assert_eq!(body["result"]["kind"], "message");
        assert_eq!(body["result"]["parts"][0]["text"], "support saw 0 turns");
        assert_eq!(body["result"]["metadata"]["isNewContext"], true);
        assert!(!body["result"]["contextId"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_a2a_rejects_unknown_method() {
        let mut agent = MockAgentExecutor::new();
        agent.expect_execute().never();
        let app = app(agent);

        let (status, _) = call(
            &app,
            Method::POST,
            "/a2a/support",
            Some(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tasks/cancel",
                "params": { "message": { "parts": [] } }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_agent_failure_maps_to_503() {
        let mut agent = MockAgentExecutor::new();
        agent
            .expect_execute()
            .returning(|_| Err(ApiError::AgentError("upstream down".to_string())));
        let app = app(agent);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/agents/sales/chat",
            Some(json!({ "contextId": "thread-1", "message": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_, turns) = call(&app, Method::GET, "/api/threads/thread-1/turns", None).await;
        assert_eq!(turns, json!([]));
    }

    #[tokio::test]
    async fn test_conversation_log_lifecycle() {
        let app = app(MockAgentExecutor::new());
        let uri = "/api/conversations/conv-9/log";

        let (status, entry) = call(
            &app,
            Method::POST,
            uri,
            Some(json!({ "sender": "customer", "content": "is it in stock?", "displayName": "Ana" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry["conversationId"], "conv-9");

        call(&app, Method::POST, uri, Some(json!({ "sender": "seller", "content": "yes" }))).await;

        let (status, entries) = call(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entries.as_array().unwrap().len(), 2);
        assert_eq!(entries[1]["sender"], "seller");

        let (status, cleared) = call(&app, Method::DELETE, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["deleted"], 2);

        let (_, entries) = call(&app, Method::GET, uri, None).await;
        assert_eq!(entries, json!([]));
    }

    #[tokio::test]
    async fn test_blank_log_content_rejected() {
        let app = app(MockAgentExecutor::new());
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/conversations/conv-1/log",
            Some(json!({ "sender": "customer", "content": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
