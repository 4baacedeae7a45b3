//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::{Result, ServerError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Prefix of daily log files inside `logging.directory`.
pub const LOG_FILE_PREFIX: &str = "marksync-server.log";

/// Build the level filter. `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber.
///
/// With a log directory configured, records also go to a daily-rolling file
/// through a background writer. The returned guard flushes that writer when
/// dropped and must be held for the life of the process.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer().with_target(true));

    match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| ServerError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            registry
                .try_init()
                .map_err(|e| ServerError::Logging(e.to_string()))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_accepted() {
        let config = LoggingConfig {
            level: "marksync_server=debug,tower_http=info".to_string(),
            directory: None,
        };
        // Must not panic on a multi-directive filter.
        let _ = env_filter(&config);
    }
}
