//! Configuration loader for frost-rs
//!
//! This module provides the `ConfigLoader` struct that handles loading
//! configuration from multiple sources with proper precedence.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "FROST_CONFIG_DIR";

/// Environment variable for specific configuration file
const CONFIG_FILE_ENV: &str = "FROST_CONFIG_FILE";

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "FROST";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
///
/// The loader supports the following configuration sources (in order of priority):
/// 1. `default.toml` - Base default configuration (required)
/// 2. `{environment}.toml` - Environment-specific configuration (optional)
/// 3. `local.toml` - Local overrides (optional)
/// 4. `FROST_*` environment variables (highest priority)
#[derive(Debug)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    /// When set, only this file is read before environment overrides
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a new configuration loader from `FROST_CONFIG_DIR`,
    /// `FROST_CONFIG_FILE` and `FROST_APP_ENV`.
    ///
    /// # Errors
    ///
    /// Returns an error if both `FROST_CONFIG_DIR` and `FROST_CONFIG_FILE` are set.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from);
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_file.is_some() && config_dir.is_some() {
            return Err(ConfigError::mutual_exclusivity(
                "FROST_CONFIG_DIR and FROST_CONFIG_FILE cannot both be set. \
                 Use FROST_CONFIG_DIR for layered configuration or \
                 FROST_CONFIG_FILE for a single configuration file.",
            ));
        }

        Ok(Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Loader reading a single file, e.g. one given with `--config`
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(path.into()),
            environment: AppEnvironment::from_env(),
        }
    }

    /// Layered loader rooted at `config_dir`
    pub fn from_dir(config_dir: impl Into<PathBuf>, environment: AppEnvironment) -> Self {
        Self {
            config_dir: config_dir.into(),
            config_file: None,
            environment,
        }
    }

    /// Override the environment selecting `{environment}.toml`
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    /// Load and validate configuration from all sources
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `default.toml` (or the single configured file) is not found
    /// - Configuration parsing fails
    /// - Configuration validation fails
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;

        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = match self.config_file {
            Some(ref config_file) => Self::add_file_source(builder, config_file, true)?,
            None => self.build_layered_config(builder)?,
        };

        // FROST_EXECUTOR__PORT -> executor.port
        Self::add_env_source(builder)
            .build()
            .map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let default_path = self.config_dir.join("default.toml");
        let builder = Self::add_file_source(builder, &default_path, true)?;

        let env_path = self
            .config_dir
            .join(format!("{}.toml", self.environment.as_str()));
        let builder = Self::add_file_source(builder, &env_path, false)?;

        let local_path = self.config_dir.join("local.toml");
        Self::add_file_source(builder, &local_path, false)
    }

    fn add_file_source(
        builder: ConfigBuilder<DefaultState>,
        path: &Path,
        required: bool,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        if required && !path.exists() {
            return Err(ConfigError::file_not_found(format!(
                "Required configuration file not found: {}",
                path.display()
            )));
        }

        Ok(builder.add_source(
            File::new(path.to_str().unwrap_or_default(), FileFormat::Toml).required(required),
        ))
    }

    fn add_env_source(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::StoreBackendKind;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests touching FROST_* variables must not interleave
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).expect("Failed to write config file");
        }
        temp_dir
    }

    /// Restores every touched environment variable on drop
    struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self {
                vars_to_restore: Vec::new(),
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        fn remove(&mut self, key: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original_value) in self.vars_to_restore.iter().rev() {
                unsafe {
                    match original_value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    const DEFAULT_TOML: &str = r#"
[executor]
name = "billing-worker"
key = "billing"
port = 21000

[[executor.jobs]]
key = "invoice"
desc = "Monthly invoices"
"#;

    #[test]
    fn test_mutual_exclusivity_error() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.set("FROST_CONFIG_DIR", "/tmp/config");
        env.set("FROST_CONFIG_FILE", "/tmp/config.toml");

        assert!(matches!(
            ConfigLoader::new(),
            Err(ConfigError::MutualExclusivityError(_))
        ));
    }

    #[test]
    fn test_missing_default_toml() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let dir = setup_config_dir(&[]);
        let loader = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development);

        assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_default_toml_only() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let dir = setup_config_dir(&[("default.toml", DEFAULT_TOML)]);
        let settings = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development)
            .load()
            .unwrap();

        assert_eq!(settings.executor.name, "billing-worker");
        assert_eq!(settings.executor.key, "billing");
        assert_eq!(settings.executor.port, 21000);
        assert_eq!(settings.executor.jobs.len(), 1);
        assert_eq!(settings.executor.jobs[0].key, "invoice");
        assert_eq!(settings.discovery.timeout_secs, 10);
    }

    #[test]
    fn test_environment_and_local_overrides() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let dir = setup_config_dir(&[
            ("default.toml", DEFAULT_TOML),
            (
                "production.toml",
                "[store]\nbackend = \"redis\"\n[store.redis]\nurl = \"redis://cache:6379\"\n",
            ),
            ("local.toml", "[discovery]\ntimeout_secs = 3\n"),
        ]);
        let settings = ConfigLoader::from_dir(dir.path(), AppEnvironment::Production)
            .load()
            .unwrap();

        assert_eq!(settings.store.backend, StoreBackendKind::Redis);
        assert_eq!(settings.store.redis.url, "redis://cache:6379");
        assert_eq!(settings.discovery.timeout_secs, 3);
        assert_eq!(settings.executor.key, "billing");

        let loader = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development)
            .with_environment(AppEnvironment::Production);
        assert_eq!(loader.environment(), AppEnvironment::Production);
    }

    #[test]
    fn test_env_var_override() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.remove("FROST_CONFIG_DIR");
        env.remove("FROST_CONFIG_FILE");
        env.set("FROST_EXECUTOR__NAME", "from-env");
        env.set("FROST_DISCOVERY__TIMEOUT_SECS", "4");

        let dir = setup_config_dir(&[("default.toml", DEFAULT_TOML)]);
        let settings = ConfigLoader::from_dir(dir.path(), AppEnvironment::Test)
            .load()
            .unwrap();

        assert_eq!(settings.executor.name, "from-env");
        assert_eq!(settings.discovery.timeout_secs, 4);
    }

    #[test]
    fn test_single_file_mode() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let dir = setup_config_dir(&[("custom.toml", "[store]\nkey_prefix = \"tenant-a\"\n")]);
        let settings = ConfigLoader::from_file(dir.path().join("custom.toml"))
            .load()
            .unwrap();

        assert_eq!(settings.store.key_prefix, "tenant-a");
        assert_eq!(settings.executor.key, "default");
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let dir = setup_config_dir(&[("default.toml", "[executor]\nport = 0\n")]);
        let result = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development).load();

        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "executor.port"
        ));
    }
}
