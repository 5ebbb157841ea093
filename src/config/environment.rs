//! Deployment environment selecting the `{environment}.toml` layer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

/// Deployment environment of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    /// Variable consulted by [`Environment::from_env`]
    pub const ENV_VAR: &'static str = "FROST_APP_ENV";

    /// Read `FROST_APP_ENV`, falling back to `Development` when it is unset
    /// or unrecognised.
    pub fn from_env() -> Self {
        std::env::var(Self::ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::EnvVarError(format!(
                "Unknown environment '{}' in {}. Expected development, test, staging or production",
                other,
                Self::ENV_VAR
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_aliases_in_any_case() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("Stage".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!(" PROD ".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Test);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        let err = "qa".parse::<Environment>().unwrap_err();
        assert!(err.to_string().contains("FROST_APP_ENV"));
    }

    #[test]
    fn test_display_matches_layer_file_stem() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::default().as_str(), "development");
    }
}
