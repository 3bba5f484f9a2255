use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info,agent_context_server=debug";

/// Install the global subscriber: console in the configured format plus a
/// daily file under `logging.directory`.
///
/// The returned guard flushes the file writer on drop; hold it for the
/// lifetime of the process.
pub fn init_logger(config: &LoggingConfig) -> Result<WorkerGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_FILTER)?,
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("server")
        .filename_suffix("log")
        .build(&config.directory)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let (console, file) = if config.format == "json" {
        (
            fmt::layer().json().with_thread_ids(true).boxed(),
            fmt::layer().json().with_writer(file_writer).boxed(),
        )
    } else {
        (
            fmt::layer().pretty().with_thread_ids(false).boxed(),
            fmt::layer().with_writer(file_writer).with_ansi(false).boxed(),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_installs_once_and_creates_directory() {
        let directory = std::env::temp_dir().join(format!("agent-context-logs-{}", uuid::Uuid::new_v4()));
        let config = LoggingConfig {
            format: "json".to_string(),
            directory: directory.to_string_lossy().into_owned(),
        };

        let _guard = init_logger(&config).unwrap();
        assert!(directory.exists());

        // A second global subscriber is refused
        assert!(init_logger(&config).is_err());
    }
}
