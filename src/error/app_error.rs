use thiserror::Error;

use crate::config::error::ConfigError;
use crate::store::StoreError;

/// Application-wide error type for the coordination and persistence layer.
///
/// Lookups by id surface [`AppError::NotFound`]; broken internal links between
/// indexes surface [`AppError::AssertionFailure`]. Substrate failures are passed
/// through unchanged as [`AppError::Store`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Two job handlers of one executor declared the same job key
    #[error("Duplicate job key '{job_key}' in group '{group_key}'")]
    DuplicateJobKey { job_key: String, group_key: String },

    /// An internal invariant between stored structures does not hold
    #[error("Assertion failed: {message}")]
    AssertionFailure { message: String },

    /// Store substrate error with operation context
    #[error("Store operation failed: {operation}")]
    Store {
        operation: String,
        #[source]
        source: StoreError,
    },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn not_found(entity: &str, field: &str, value: impl Into<String>) -> Self {
        AppError::NotFound {
            entity: entity.to_string(),
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        AppError::AssertionFailure {
            message: message.into(),
        }
    }

    pub fn store(operation: impl Into<String>, source: StoreError) -> Self {
        AppError::Store {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        AppError::store("store operation", error)
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = match &error {
            ConfigError::ValidationError { field, .. } => field.clone(),
            _ => "settings".to_string(),
        };
        AppError::Configuration {
            key,
            source: anyhow::Error::from(error),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let error = AppError::not_found("JobInfo", "id", "42");
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Resource not found: JobInfo with id=42");
    }

    #[test]
    fn test_config_error_keeps_field() {
        let error: AppError = ConfigError::validation("executor.key", "must not be empty").into();
        match error {
            AppError::Configuration { key, .. } => assert_eq!(key, "executor.key"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_store_error_is_wrapped() {
        let error: AppError = StoreError::Connection("refused".to_string()).into();
        assert!(matches!(
            error,
            AppError::Store {
                source: StoreError::Connection(_),
                ..
            }
        ));
    }
}
