use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use agent_context_server::config::{MemoryBackend, Settings};
use agent_context_server::database::{DbPool, PgConversationLogRepository, PgTurnRepository};
use agent_context_server::identity::SignatureCodec;
use agent_context_server::memory::{ConversationMemoryStore, InMemoryTurnRepository, TurnRepository};
use agent_context_server::router::build_router;
use agent_context_server::security::ContextExtractor;
use agent_context_server::services::{
    ConversationLog, ConversationService, InMemoryConversationLog, MessageContextBuilder,
    OpenAiCompatibleAgent, ThreadMessages,
};
use agent_context_server::state::AppState;
use agent_context_server::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (fails fast on a missing or short signing key)
    let settings = Settings::load()?;

    let _log_guard = init_logger(&settings.logging)?;
    info!("🚀 Starting Agent Context Server...");
    info!("✅ Configuration loaded");

    let codec = SignatureCodec::new(&settings.security.signing_key)?;

    // Storage backend
    let (turns, conversation_log, db_pool): (
        Arc<dyn TurnRepository>,
        Arc<dyn ConversationLog>,
        Option<DbPool>,
    ) = match settings.memory.backend {
        MemoryBackend::Postgres => {
            let db_pool = DbPool::new(&settings.database).await?;
            db_pool.ensure_schema().await?;
            info!("✅ Database connection established");
            (
                Arc::new(PgTurnRepository::new(db_pool.clone())),
                Arc::new(PgConversationLogRepository::new(db_pool.clone())),
                Some(db_pool),
            )
        }
        MemoryBackend::InMemory => {
            warn!("⚠️ Using in-memory conversation storage, history is lost on restart");
            (
                Arc::new(InMemoryTurnRepository::new()),
                Arc::new(InMemoryConversationLog::new()),
                None,
            )
        }
    };

    // Initialize services
    let memory = ConversationMemoryStore::new(turns, settings.memory.window_size);
    let thread_messages: Arc<dyn ThreadMessages> = Arc::new(memory.clone());
    let context_builder = MessageContextBuilder::new(thread_messages, conversation_log.clone());
    let agent = Arc::new(OpenAiCompatibleAgent::new(settings.agent.clone())?);

    let conversation_service = Arc::new(ConversationService::new(
        memory.clone(),
        context_builder,
        agent,
    ));

    let extractor = Arc::new(ContextExtractor::new(
        codec.clone(),
        settings.security.agent_path_prefixes.clone(),
        settings.server.body_limit_bytes,
    ));

    let mint_api_key = settings
        .security
        .mint_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(Arc::<str>::from);
    if mint_api_key.is_none() {
        info!("Context minting endpoint disabled (no security.mint_api_key)");
    }

    let state = AppState {
        codec,
        mint_api_key,
        memory,
        conversation_log,
        conversation_service,
    };

    let app = build_router(state, extractor, settings.server.body_limit_bytes);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db_pool) = db_pool {
        db_pool.close().await;
    }
    info!("👋 Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
