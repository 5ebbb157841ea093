//! Store substrate shared by the controller and every executor.
//!
//! The persistence and discovery layers only see the [`StoreBackend`] trait:
//! - namespaced maps (optionally with per-entry expiry)
//! - ordered multimap buckets (one list per key)
//! - a publish/subscribe topic that reports its subscriber count
//! - a counting semaphore with timeout
//!
//! # Configuration
//!
//! ```toml
//! [store]
//! backend = "redis"  # or "memory"
//! key_prefix = "frost"
//!
//! [store.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 8
//! connection_timeout = 5
//! ```

mod error;
mod keys;
mod manager;
mod memory;
mod redis;
mod traits;

pub use error::StoreError;
pub use keys::{KeySpace, RecordIndex, SEPARATOR};
pub use manager::StoreManager;
pub(crate) use manager::{decode, encode};
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use traits::{StoreBackend, Subscription};

// Re-export config types
pub use crate::config::settings::{RedisStoreConfig, StoreBackendKind, StoreConfig};
