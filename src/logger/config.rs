//! Runtime configuration for the logger

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::error::LoggerError;

/// Main logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub console: ConsoleConfig,
    pub file: FileConfig,
    /// Level or `EnvFilter` directive, e.g. `info` or `frost_rs=debug,warn`
    pub level: String,
}

impl LoggerConfig {
    /// Create a new logger configuration with validation
    pub fn new(console: ConsoleConfig, file: FileConfig, level: String) -> Result<Self> {
        let config = Self {
            console,
            file,
            level,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.env_filter()
            .with_context(|| format!("Invalid log level: {}", self.level))?;

        self.file
            .validate()
            .context("Invalid file configuration")?;

        if !self.console.enabled && !self.file.enabled {
            anyhow::bail!("At least one output (console or file) must be enabled");
        }

        Ok(())
    }

    /// Build the filter applied to every output layer
    pub fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        EnvFilter::try_new(&self.level).map_err(|e| LoggerError::config(e.to_string()))
    }

    /// Copy with the level replaced, used by `--verbose` and `--quiet`
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
            level: "info".to_string(),
        }
    }
}

/// Console output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Honoured only when stdout is a terminal
    pub colored: bool,
}

impl ConsoleConfig {
    pub fn new(enabled: bool, colored: bool) -> Self {
        Self { enabled, colored }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

/// File output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
    pub format: LogFormat,
}

impl FileConfig {
    /// Pure check; the parent directory is created when the writer opens the file.
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.path.as_os_str().is_empty() {
            anyhow::bail!("File path cannot be empty when file output is enabled");
        }
        Ok(())
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("logs/frost.log"),
            append: true,
            format: LogFormat::default(),
        }
    }
}

/// Line format of the file output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggerError::format(format!(
                "Invalid log format '{}'. Valid formats are: full, compact, json",
                s
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Full => "full",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LoggerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_level_accepts_filter_directives() {
        let config = LoggerConfig::default().with_level("frost_rs=debug,warn");
        assert!(config.validate().is_ok());

        let config = LoggerConfig::default().with_level("frost_rs=[");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_requires_an_output() {
        let result = LoggerConfig::new(
            ConsoleConfig::new(false, false),
            FileConfig::default(),
            "info".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_enabled_file_needs_path() {
        let file = FileConfig {
            enabled: true,
            path: PathBuf::new(),
            ..FileConfig::default()
        };
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(LoggerError::Format { .. })
        ));
        assert_eq!(LogFormat::Full.to_string(), "full");
    }
}
