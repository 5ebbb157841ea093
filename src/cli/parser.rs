//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::build;
use crate::config::Environment as ConfigEnvironment;

/// Coordination layer of the frost job scheduler
#[derive(Parser, Debug)]
#[command(name = "frost-rs")]
#[command(about = "Coordination and persistence layer of the frost job scheduler")]
#[command(long_about = "
frost-rs lets a controller discover live executors through the shared store
and keeps job definitions and execution history there.

EXAMPLES:
    # Run an executor that answers discovery probes until Ctrl-C
    frost-rs executor

    # List the executors answering right now
    frost-rs executors

    # Only count them, waiting at most 3 seconds
    frost-rs executors --count --timeout 3

    # Use a custom configuration file
    frost-rs --config /etc/frost/production.toml executor

    # Validate configuration and exit
    frost-rs --env production check
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// Read this single TOML file instead of the layered files under
    /// `config/`. `FROST_*` environment variables still apply on top.
    ///
    /// Example: --config /etc/frost/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded, overriding
    /// `FROST_APP_ENV`.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Raises the log level to debug. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Lowers the log level to error. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run an executor answering discovery probes
    ///
    /// Builds the executor identity from the `executor` section and answers
    /// every probe until interrupted with Ctrl-C.
    Executor,

    /// Discover the executors that are alive right now
    ///
    /// Broadcasts one probe and prints the answering executors as JSON.
    ///
    /// Examples:
    ///   frost-rs executors                      # Print executor descriptions
    ///   frost-rs executors --count              # Print only how many answered
    Executors {
        /// Print only the number of executors
        #[arg(long)]
        count: bool,

        /// Discovery window in seconds
        ///
        /// Overrides `discovery.timeout_secs` for this probe.
        #[arg(long, value_name = "SECONDS", value_parser = super::validation::validate_timeout_secs)]
        timeout: Option<u64>,
    },

    /// Validate configuration and exit
    Check,
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl From<Environment> for ConfigEnvironment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => ConfigEnvironment::Development,
            Environment::Test => ConfigEnvironment::Test,
            Environment::Staging => ConfigEnvironment::Staging,
            Environment::Production => ConfigEnvironment::Production,
        }
    }
}

impl Cli {
    /// Log level forced by `--verbose` or `--quiet`
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}
