mod settings;

pub use settings::{
    AgentConfig, DatabaseConfig, LoggingConfig, MemoryBackend, MemoryConfig, SecurityConfig,
    ServerConfig, Settings,
};
