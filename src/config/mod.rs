//! Configuration management module for frost-rs
//!
//! This module provides layered configuration loading with support for:
//! - TOML configuration files
//! - Environment variable overrides
//! - Multiple environment configurations (development, test, staging, production)
//!
//! # Configuration Priority (lowest to highest)
//! 1. `default.toml` - Base default configuration
//! 2. `{environment}.toml` - Environment-specific configuration
//! 3. `local.toml` - Local overrides (not committed to version control)
//! 4. `FROST_*` environment variables, e.g. `FROST_STORE__BACKEND=redis`
//!
//! Setting `FROST_CONFIG_FILE` (or passing `--config`) replaces the three
//! file layers with a single file.

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    ApplicationConfig, DeclaredJob, DiscoveryConfig, ExecutorConfig, LoggerSettings,
    RedisStoreConfig, Settings, StoreBackendKind, StoreConfig,
};
