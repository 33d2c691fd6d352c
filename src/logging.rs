//! Structured logging configuration using tracing

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Warn,
        }
    }
}

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Pretty,
        }
    }
}

/// Initialize logging with the given configuration
///
/// `RUST_LOG`, when set, overrides the configured level. Logs go to stderr
/// so they never mix with command output. If a subscriber is already
/// installed (tests, embedding hosts) it is kept.
pub fn init_logging(config: &LogConfig) {
    let level: Level = config.level.into();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if let Err(err) = installed {
        tracing::debug!(error = %err, "keeping existing tracing subscriber");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from("error"), LogLevel::Error);
        assert_eq!(LogLevel::from("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from("debug"), LogLevel::Debug);

        // Unknown defaults to Warn
        assert_eq!(LogLevel::from("unknown"), LogLevel::Warn);
    }

    #[test]
    fn test_log_level_to_tracing_level() {
        let level: Level = LogLevel::Error.into();
        assert_eq!(level, Level::ERROR);

        let level: Level = LogLevel::Trace.into();
        assert_eq!(level, Level::TRACE);
    }

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_init_twice_keeps_first_subscriber() {
        let config = LogConfig::default();
        init_logging(&config);
        init_logging(&LogConfig {
            level: LogLevel::Trace,
            format: LogFormat::Json,
        });
        assert!(tracing::dispatcher::has_been_set());
    }
}
