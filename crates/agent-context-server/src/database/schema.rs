/// Idempotent DDL for the conversation tables.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversation_turns (
    thread_key                 TEXT NOT NULL,
    record_key                 TEXT NOT NULL,
    sequence_timestamp_millis  BIGINT NOT NULL,
    serialized_payload         TEXT NOT NULL,
    plain_text                 TEXT NOT NULL,
    PRIMARY KEY (thread_key, record_key)
);

CREATE INDEX IF NOT EXISTS idx_conversation_turns_thread_seq
    ON conversation_turns (thread_key, sequence_timestamp_millis DESC);

CREATE TABLE IF NOT EXISTS conversation_log_entries (
    id               BIGSERIAL PRIMARY KEY,
    conversation_id  TEXT NOT NULL,
    sender           TEXT NOT NULL CHECK (sender IN ('customer', 'seller')),
    content          TEXT NOT NULL,
    "timestamp"      TIMESTAMPTZ NOT NULL,
    display_name     TEXT
);

CREATE INDEX IF NOT EXISTS idx_conversation_log_entries_conversation
    ON conversation_log_entries (conversation_id, "timestamp", id);
"#;
