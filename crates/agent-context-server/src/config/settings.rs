use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::identity::SignatureCodec;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub memory: MemoryConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Shared HMAC secret for context identifiers (min 32 chars)
    pub signing_key: String,
    /// POST paths starting with any of these go through context extraction
    pub agent_path_prefixes: Vec<String>,
    /// Enables `POST /api/context/mint` for callers presenting this key
    #[serde(default)]
    pub mint_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    Postgres,
    InMemory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    pub backend: MemoryBackend,
    /// Number of most recent turns replayed into each agent call
    pub window_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub system_prompt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    pub format: String,
    pub directory: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.agent_path_prefixes")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Builder pre-populated with every default except the signing key.
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.body_limit_bytes", 2 * 1024 * 1024)?
            .set_default("security.signing_key", "")?
            .set_default("security.agent_path_prefixes", vec!["/a2a", "/api/agents"])?
            .set_default("database.url", "postgres://localhost/agent_context")?
            .set_default("database.pool_max_size", 10)?
            .set_default("database.pool_timeout_seconds", 5)?
            .set_default("memory.backend", "postgres")?
            .set_default("memory.window_size", 10)?
            .set_default("agent.base_url", "http://localhost:8081")?
            .set_default("agent.model", "default")?
            .set_default("agent.timeout_seconds", 60)?
            .set_default("agent.max_tokens", 1024)?
            .set_default("agent.system_prompt", DEFAULT_SYSTEM_PROMPT)?
            .set_default("logging.format", "pretty")?
            .set_default("logging.directory", "logs")?;

        Ok(builder)
    }

    /// Startup checks; any failure here is a deployment misconfiguration.
    pub fn validate(&self) -> Result<()> {
        // Surfaces missing/short key with the same error the codec reports
        SignatureCodec::new(&self.security.signing_key)?;

        if self.memory.window_size == 0 {
            bail!("memory.window_size must be greater than 0");
        }

        if let Some(key) = self.security.mint_api_key.as_deref() {
            if !key.trim().is_empty() && key.len() < MIN_MINT_API_KEY_LEN {
                bail!(
                    "security.mint_api_key too short: {} characters (min: {})",
                    key.len(),
                    MIN_MINT_API_KEY_LEN
                );
            }
        }

        if self.security.agent_path_prefixes.is_empty() {
            bail!("security.agent_path_prefixes must list at least one prefix");
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            bail!("logging.format must be \"pretty\" or \"json\", got {:?}", self.logging.format);
        }

        Ok(())
    }
}

const MIN_MINT_API_KEY_LEN: usize = 16;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful sales assistant. \
Answer the customer's question using the conversation history you are given. \
Only introduce yourself when the message is marked as a first interaction.";

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(overrides: &[(&str, &str)]) -> Result<Settings> {
        let mut builder = Settings::builder()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        Ok(builder.build()?.try_deserialize()?)
    }

    #[test]
    fn test_defaults() {
        let settings = settings_with(&[]).unwrap();
        assert_eq!(settings.memory.window_size, 10);
        assert_eq!(settings.memory.backend, MemoryBackend::Postgres);
        assert_eq!(settings.security.agent_path_prefixes, vec!["/a2a", "/api/agents"]);
    }

    #[test]
    fn test_missing_signing_key_is_fatal() {
        let settings = settings_with(&[]).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_short_signing_key_is_fatal() {
        let settings = settings_with(&[("security.signing_key", "short")]).unwrap();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_valid_settings() {
        let settings = settings_with(&[
            ("security.signing_key", "0123456789abcdef0123456789abcdef"),
            ("memory.backend", "in_memory"),
        ])
        .unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.memory.backend, MemoryBackend::InMemory);
    }

    #[test]
    fn test_zero_window_rejected() {
        let settings: Settings = Settings::builder()
            .unwrap()
            .set_override("security.signing_key", "0123456789abcdef0123456789abcdef")
            .unwrap()
            .set_override("memory.window_size", 0)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_mint_api_key_is_optional_but_not_weak() {
        let settings = settings_with(&[("security.signing_key", "0123456789abcdef0123456789abcdef")]).unwrap();
        assert_eq!(settings.security.mint_api_key, None);

        let weak = settings_with(&[
            ("security.signing_key", "0123456789abcdef0123456789abcdef"),
            ("security.mint_api_key", "abc"),
        ])
        .unwrap();
        assert!(weak.validate().is_err());

        let strong = settings_with(&[
            ("security.signing_key", "0123456789abcdef0123456789abcdef"),
            ("security.mint_api_key", "front-end-mint-key-0001"),
        ])
        .unwrap();
        assert!(strong.validate().is_ok());
    }
}
