pub mod agent;
pub mod conversation;
pub mod conversation_log;
pub mod message_context;

pub use agent::{AgentExecutor, AgentRequest, OpenAiCompatibleAgent};
pub use conversation::{ConversationService, TurnInput, TurnOutcome};
pub use conversation_log::{ConversationLog, ConversationLogEntry, InMemoryConversationLog, Sender};
pub use message_context::{MessageContext, MessageContextBuilder, ThreadMessages};
