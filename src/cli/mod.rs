//! CLI module for frost-rs
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing with clap
//! - Configuration loading driven by the global flags
//! - Command execution

pub mod executor;
pub mod parser;
pub mod validation;

pub use executor::{execute_command, run_executor};
pub use parser::{Cli, Commands, Environment};

use crate::config::{ConfigError, ConfigLoader, Settings};
use crate::logger::init_logger;

/// Load settings as selected by `--config` and `--env`, then apply
/// `--verbose` / `--quiet` to the log level.
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let mut loader = match &cli.config {
        Some(path) => ConfigLoader::from_file(path),
        None => ConfigLoader::new()?,
    };
    if let Some(env) = cli.env {
        loader = loader.with_environment(env.into());
    }

    let mut settings = loader.load()?;
    if let Some(level) = cli.log_level_override() {
        settings.logger.level = level.to_string();
    }
    Ok(settings)
}

/// Initialize logger from settings
pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings.logger.clone().into_logger_config()?;
    init_logger(logger_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_settings_from_config_flag() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[store]\nkey_prefix = \"from-file\"\n[logger]\nlevel = \"warn\"\n",
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["frost-rs", "--config", path, "check"]).unwrap();
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.store.key_prefix, "from-file");
        assert_eq!(settings.logger.level, "warn");

        let cli = Cli::try_parse_from(["frost-rs", "--config", path, "--verbose", "check"]).unwrap();
        assert_eq!(load_settings(&cli).unwrap().logger.level, "debug");
    }
}
