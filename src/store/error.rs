//! Store error types.

use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store operation failed: {0}")]
    Operation(String),

    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_connection_dropped() || error.is_connection_refusal() || error.is_timeout() {
            StoreError::Connection(error.to_string())
        } else {
            StoreError::Operation(error.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}
