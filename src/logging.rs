//! Tracing Infrastructure
//!
//! Structured logging for the library and the CLI, built on `tracing` and
//! `tracing-subscriber`:
//! - Pretty, compact or JSON output, chosen by `application.log_format`
//! - Environment-based filtering (`RUST_LOG` wins over the configured level)
//! - Records go to stderr so captured lines on stdout stay clean
//!
//! # Example
//! ```no_run
//! use rssi_logger::{config::AppConfig, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! logging::init_from_config(&config)?;
//! info!("Logger ready");
//! # Ok(())
//! # }
//! ```

use crate::config::AppConfig;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, human-oriented records
    Pretty,
    /// One line per record
    Compact,
    /// One JSON object per record
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Maximum level emitted
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Whether to colour pretty and compact output
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create tracing config from the application configuration
    pub fn from_app_config(config: &AppConfig) -> Result<Self, String> {
        let level = parse_log_level(&config.application.log_level)?;
        let format = parse_output_format(&config.application.log_format)?;
        Ok(Self::new(level).with_format(format))
    }

    /// Create tracing config with custom settings
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the application configuration.
///
/// Colours are enabled only when stderr is a terminal.
pub fn init_from_config(config: &AppConfig) -> Result<(), String> {
    use std::io::IsTerminal;

    let tracing_config =
        TracingConfig::from_app_config(config)?.with_ansi(std::io::stderr().is_terminal());
    init(tracing_config)
}

/// Initialize tracing with custom configuration
///
/// Idempotent: if a global subscriber is already installed this returns `Ok(())`,
/// so tests and embedding applications can call it freely.
pub fn init(config: TracingConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let layer = match config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_ansi(config.with_ansi)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(config.with_ansi)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            // Already initialised by a test harness or an embedding application
            if e.to_string().contains("a global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )),
    }
}

/// Parse an output format name (pretty, compact, json)
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "pretty" => Ok(OutputFormat::Pretty),
        "compact" => Ok(OutputFormat::Compact),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid log format '{}'. Must be one of: pretty, compact, json",
            format
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(matches!(parse_log_level("Debug"), Ok(Level::DEBUG)));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!(parse_output_format("pretty"), Ok(OutputFormat::Pretty));
        assert_eq!(parse_output_format("JSON"), Ok(OutputFormat::Json));
        assert_eq!(parse_output_format("compact"), Ok(OutputFormat::Compact));
        assert!(parse_output_format("xml").is_err());
    }

    #[test]
    fn test_tracing_config_from_app_config() {
        let mut config = AppConfig::default();
        config.application.log_level = "warn".to_string();
        config.application.log_format = "json".to_string();

        let tracing_config = TracingConfig::from_app_config(&config).unwrap();
        assert_eq!(tracing_config.level, Level::WARN);
        assert_eq!(tracing_config.format, OutputFormat::Json);
    }

    #[test]
    fn test_default_format_is_compact() {
        let tracing_config = TracingConfig::from_app_config(&AppConfig::default()).unwrap();
        assert_eq!(tracing_config.format, OutputFormat::Compact);
        assert!(!tracing_config.with_ansi(false).with_ansi);
    }

    #[test]
    fn test_bad_format_rejected() {
        let mut config = AppConfig::default();
        config.application.log_format = "yaml".to_string();
        assert!(TracingConfig::from_app_config(&config).is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        assert!(init(TracingConfig::default()).is_ok());
        assert!(init(TracingConfig::new(Level::DEBUG).with_format(OutputFormat::Pretty)).is_ok());
    }
}
