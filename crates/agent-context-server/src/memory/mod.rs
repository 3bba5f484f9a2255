//! Conversation memory
//!
//! Persists chat turns per thread and replays the most recent window in
//! chronological order. Storage is pluggable through [`TurnRepository`]
//! (Postgres in production, DashMap for development and tests).

pub mod in_memory;
pub mod repository;
mod store;
pub mod types;

pub use in_memory::InMemoryTurnRepository;
pub use repository::TurnRepository;
pub use store::{ConversationMemoryStore, ConversationThread, SequenceClock, DEFAULT_WINDOW_SIZE};
pub use types::{ChatTurn, TurnRecord, TurnRole};
