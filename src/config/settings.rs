//! Configuration settings structures for frost-rs
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "frost-rs".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/frost.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_key_prefix() -> String {
    "frost".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    8
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_executor_name() -> String {
    "frost-executor".to_string()
}

fn default_executor_key() -> String {
    "default".to_string()
}

fn default_executor_port() -> u16 {
    20000
}

fn default_discovery_timeout() -> u64 {
    10
}

fn default_response_ttl() -> u64 {
    60
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level or filter directive, e.g. "info" or "frost_rs=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = self.file.into_file_config()?;

        LoggerConfig::new(console, file, self.level).map_err(|e| ConfigError::ValidationError {
            field: "logger".to_string(),
            message: e.to_string(),
        })
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        Ok(FileConfig {
            enabled: self.enabled,
            path: PathBuf::from(self.path),
            append: self.append,
            format,
        })
    }
}

// ============================================================================
// Store Configuration
// ============================================================================

/// Store backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// In-process store, only visible to the current process
    #[default]
    Memory,
    /// Shared Redis instance
    Redis,
}

/// Redis store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type
    #[serde(default)]
    pub backend: StoreBackendKind,

    /// Prefix of every key written by this layer
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Redis store settings
    #[serde(default)]
    pub redis: RedisStoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            key_prefix: default_key_prefix(),
            redis: RedisStoreConfig::default(),
        }
    }
}

// ============================================================================
// Executor Configuration
// ============================================================================

/// A job handler declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredJob {
    /// Job key, unique within the executor
    pub key: String,

    /// Human readable description
    #[serde(default)]
    pub desc: String,
}

/// Local executor identity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Executor display name
    #[serde(default = "default_executor_name")]
    pub name: String,

    /// Shared key, also the group key of every job this executor hosts
    #[serde(default = "default_executor_key")]
    pub key: String,

    /// Advertised IP address; auto-detected when absent
    #[serde(default)]
    pub ip: Option<String>,

    /// Advertised port
    #[serde(default = "default_executor_port")]
    pub port: u16,

    /// Job handlers exposed by the executor command
    #[serde(default)]
    pub jobs: Vec<DeclaredJob>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: default_executor_name(),
            key: default_executor_key(),
            ip: None,
            port: default_executor_port(),
            jobs: Vec::new(),
        }
    }
}

// ============================================================================
// Discovery Configuration
// ============================================================================

/// Executor discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// How long a probe waits for executors to answer, in seconds
    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,

    /// Lifetime of an executor's answer in the store, in seconds
    #[serde(default = "default_response_ttl")]
    pub response_ttl_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_discovery_timeout(),
            response_ttl_secs: default_response_ttl(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Local executor configuration
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}
