//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    DiscoveryConfig, ExecutorConfig, LoggerSettings, Settings, StoreBackendKind, StoreConfig,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl LoggerSettings {
    /// Validate logger configuration
    ///
    /// # Validation Rules
    /// - Level must be a known level or a filter directive containing `=`
    /// - File format must be one of full, compact, json
    /// - At least one output must be enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) && !level.contains('=') {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        if !VALID_LOG_FORMATS.contains(&self.file.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.file.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        if self.file.enabled && self.file.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path cannot be empty when file output is enabled.",
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        Ok(())
    }
}

impl StoreConfig {
    /// Validate store configuration
    ///
    /// # Validation Rules
    /// - Key prefix must not be empty
    /// - Redis URL must use the redis:// or rediss:// scheme when the Redis backend is selected
    /// - Pool size must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_prefix.trim().is_empty() {
            return Err(ConfigError::validation(
                "store.key_prefix",
                "Key prefix cannot be empty.",
            ));
        }

        if self.backend == StoreBackendKind::Redis {
            let url = self.redis.url.trim();
            if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                return Err(ConfigError::validation(
                    "store.redis.url",
                    "Invalid Redis URL. Expected format: redis://[user:password@]host[:port][/db]",
                ));
            }

            if self.redis.pool_size == 0 {
                return Err(ConfigError::validation(
                    "store.redis.pool_size",
                    "Pool size must be greater than 0.",
                ));
            }
        }

        Ok(())
    }
}

impl ExecutorConfig {
    /// Validate executor configuration
    ///
    /// Duplicate job keys are not checked here; registering the handlers
    /// reports them with the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation(
                "executor.name",
                "Executor name cannot be empty.",
            ));
        }

        if self.key.trim().is_empty() {
            return Err(ConfigError::validation(
                "executor.key",
                "Executor key cannot be empty.",
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::validation(
                "executor.port",
                "Port must be between 1 and 65535.",
            ));
        }

        if let Some(index) = self.jobs.iter().position(|job| job.key.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                field: format!("executor.jobs[{}].key", index),
                message: "Job key cannot be empty.".to_string(),
            });
        }

        Ok(())
    }
}

impl DiscoveryConfig {
    /// Validate discovery configuration
    ///
    /// # Validation Rules
    /// - Timeout must be greater than 0
    /// - Responses must live at least as long as the probe waits for them
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::validation(
                "discovery.timeout_secs",
                "Discovery timeout must be greater than 0 seconds.",
            ));
        }

        if self.response_ttl_secs < self.timeout_secs {
            return Err(ConfigError::ValidationError {
                field: "discovery.response_ttl_secs".to_string(),
                message: format!(
                    "Response TTL ({}) cannot be shorter than the discovery timeout ({}).",
                    self.response_ttl_secs, self.timeout_secs
                ),
            });
        }

        Ok(())
    }
}

impl Settings {
    /// Validate the complete settings tree
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.store.validate()?;
        self.executor.validate()?;
        self.discovery.validate()?;
        Ok(())
    }
}
