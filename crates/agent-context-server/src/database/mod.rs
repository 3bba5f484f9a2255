pub mod conversation_log_repository;
pub mod pool;
pub mod schema;
pub mod turn_repository;

pub use conversation_log_repository::PgConversationLogRepository;
pub use pool::DbPool;
pub use turn_repository::PgTurnRepository;
