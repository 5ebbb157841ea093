//! Logger Module
//!
//! A logging system based on `tracing-subscriber` with support for:
//! - Console output with color control
//! - File output in one of three formats (Full, Compact, JSON)
//! - `EnvFilter` directives as the level, e.g. `frost_rs::discovery=debug,info`

pub mod config;
pub mod error;
mod writer;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};
pub use error::LoggerError;

use std::io::IsTerminal;

use tracing::Subscriber;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, Layer,
};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Install the global subscriber described by `config`.
///
/// Fails when the configuration is invalid, the log file cannot be opened, or
/// a global subscriber is already installed.
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    config.validate()?;
    let filter = config.env_filter()?;

    let file = if config.file.enabled {
        Some(file_layer(&config.file)?)
    } else {
        None
    };
    let console = config
        .console
        .enabled
        .then(|| console_layer(&config.console));

    // The file layer goes first so console ANSI settings never leak into
    // span fields written to the file (tokio-rs/tracing#1817).
    tracing_subscriber::registry()
        .with(filter)
        .with(file)
        .with(console)
        .try_init()?;

    Ok(())
}

fn console_layer<S>(config: &ConsoleConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = config.colored && std::io::stdout().is_terminal();

    fmt::layer()
        .with_ansi(use_ansi)
        .with_target(true)
        .with_level(true)
        .boxed()
}

fn file_layer<S>(config: &FileConfig) -> Result<BoxedLayer<S>, LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let writer = writer::open_log_file(config)?;

    let layer = match config.format {
        LogFormat::Full => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .compact()
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_ansi(false)
            .json()
            .with_writer(writer)
            .boxed(),
    };

    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // The only test installing the global subscriber.
    #[test]
    fn test_init_logger_writes_json_lines_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frost.log");
        let config = LoggerConfig::new(
            ConsoleConfig::new(false, false),
            FileConfig {
                enabled: true,
                path: path.clone(),
                append: false,
                format: LogFormat::Json,
            },
            "info".to_string(),
        )
        .unwrap();

        init_logger(config).unwrap();
        tracing::info!(marker = "logger-json-marker", "hello from the logger test");

        let content = std::fs::read_to_string(&path).unwrap();
        let line = content
            .lines()
            .find(|line| line.contains("logger-json-marker"))
            .expect("marker line present");
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["level"], "INFO");

        // A second install is rejected instead of silently replacing the first
        assert!(init_logger(LoggerConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_install() {
        let config = LoggerConfig {
            console: ConsoleConfig::new(false, false),
            ..LoggerConfig::default()
        };
        assert!(init_logger(config).is_err());
    }
}
