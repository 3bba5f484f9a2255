use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::repository::TurnRepository;
use super::types::{ChatTurn, TurnRecord};
use crate::utils::error::StoreError;

pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Hands out batch base timestamps.
///
/// Each reservation starts at wall-clock millis, bumped past the end of the
/// previous reservation so sequential batches in this process never share a
/// sequence value even inside the same millisecond.
#[derive(Debug, Default)]
pub struct SequenceClock {
    next_free: AtomicI64,
}

impl SequenceClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `len` consecutive sequence values and return the first.
    pub fn reserve(&self, len: usize) -> i64 {
        let now = Utc::now().timestamp_millis();
        let len = len.max(1) as i64;

        let previous = self
            .next_free
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next_free| {
                Some(now.max(next_free) + len)
            })
            .unwrap_or_else(|current| current);

        now.max(previous)
    }
}

/// Ordered, windowed conversation history keyed by thread.
#[derive(Clone)]
pub struct ConversationMemoryStore {
    repository: Arc<dyn TurnRepository>,
    clock: Arc<SequenceClock>,
    window_size: usize,
}

impl ConversationMemoryStore {
    pub fn new(repository: Arc<dyn TurnRepository>, window_size: usize) -> Self {
        info!("Initializing conversation memory store (window={})", window_size);
        Self {
            repository,
            clock: Arc::new(SequenceClock::new()),
            window_size,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Open a handle on `thread_key`, minting a random key when none is given.
    pub fn thread(&self, thread_key: Option<String>) -> ConversationThread {
        let thread_key = thread_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(new_thread_key);

        ConversationThread {
            store: self.clone(),
            thread_key,
        }
    }

    /// The `limit` most recent turns of the thread, oldest first.
    pub async fn load_recent(
        &self,
        thread_key: &str,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, StoreError> {
        if thread_key.is_empty() {
            return Ok(Vec::new());
        }

        // Newest first from the store, then flipped into reading order
        let records = self.repository.fetch_latest(thread_key, limit).await?;

        let mut turns = records
            .iter()
            .map(TurnRecord::to_turn)
            .collect::<Result<Vec<_>, _>>()?;
        turns.reverse();

        debug!("Loaded {} turns for thread {}", turns.len(), thread_key);
        Ok(turns)
    }

    /// [`load_recent`](Self::load_recent) with the configured window size.
    pub async fn load_window(&self, thread_key: &str) -> Result<Vec<ChatTurn>, StoreError> {
        self.load_recent(thread_key, self.window_size).await
    }

    /// Persist `turns` in call order and return the thread key used.
    pub async fn append(
        &self,
        thread_key: Option<&str>,
        turns: &[ChatTurn],
    ) -> Result<String, StoreError> {
        let thread_key = thread_key
            .filter(|key| !key.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_thread_key);

        if turns.is_empty() {
            return Ok(thread_key);
        }

        let base = self.clock.reserve(turns.len());
        let records = turns
            .iter()
            .enumerate()
            .map(|(idx, turn)| TurnRecord::from_turn(&thread_key, turn, base + idx as i64))
            .collect::<Result<Vec<_>, _>>()?;

        self.repository.upsert_batch(records).await?;

        debug!(
            "Appended {} turns to thread {} (base sequence {})",
            turns.len(),
            thread_key,
            base
        );
        Ok(thread_key)
    }

    pub async fn count_turns(&self, thread_key: &str) -> Result<u64, StoreError> {
        if thread_key.is_empty() {
            return Ok(0);
        }
        self.repository.count(thread_key).await
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.repository.ping().await
    }
}

/// A store bound to a single thread key.
#[derive(Clone)]
pub struct ConversationThread {
    store: ConversationMemoryStore,
    thread_key: String,
}

impl ConversationThread {
    /// Key to hand back to the client for the next turn.
    pub fn thread_key(&self) -> &str {
        &self.thread_key
    }

    pub async fn load_recent(&self, limit: usize) -> Result<Vec<ChatTurn>, StoreError> {
        self.store.load_recent(&self.thread_key, limit).await
    }

    pub async fn load_window(&self) -> Result<Vec<ChatTurn>, StoreError> {
        self.store.load_window(&self.thread_key).await
    }

    pub async fn append(&self, turns: &[ChatTurn]) -> Result<(), StoreError> {
        self.store.append(Some(self.thread_key.as_str()), turns).await?;
        Ok(())
    }
}

fn new_thread_key() -> String {
    uuid::Uuid::new_v4().to_string()
}
