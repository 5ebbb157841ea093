//! Store manager that dispatches to the configured backend.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::settings::{StoreBackendKind, StoreConfig};
use crate::store::memory::MemoryStore;
use crate::store::redis::RedisStore;
use crate::store::{KeySpace, StoreBackend, StoreError};

/// Handle to the shared store plus the key layout every caller agrees on.
///
/// Cloning is cheap; all clones talk to the same backend.
#[derive(Clone)]
pub struct StoreManager {
    backend: Arc<dyn StoreBackend>,
    keys: KeySpace,
}

impl StoreManager {
    /// Create a store manager for the configured backend.
    pub async fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend: Arc<dyn StoreBackend> = match config.backend {
            StoreBackendKind::Memory => Arc::new(MemoryStore::new()),
            StoreBackendKind::Redis => Arc::new(RedisStore::new(&config.redis).await?),
        };

        tracing::debug!(backend = ?config.backend, prefix = %config.key_prefix, "Store initialized");
        Ok(Self::with_backend(backend, KeySpace::new(config.key_prefix.clone())))
    }

    /// Wrap an existing backend.
    pub fn with_backend(backend: Arc<dyn StoreBackend>, keys: KeySpace) -> Self {
        Self { backend, keys }
    }

    /// Fresh in-memory store with the default key layout.
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryStore::new()), KeySpace::default())
    }

    /// Get a reference to the store backend.
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Get the key layout.
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }
}

/// Encode a value for storage.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(StoreError::from)
}

/// Decode a stored value.
pub(crate) fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(StoreError::from)
}
