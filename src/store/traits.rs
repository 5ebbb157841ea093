//! StoreBackend trait definition.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;

use crate::store::StoreError;

/// Stream of payloads delivered to a topic subscriber.
pub type Subscription = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Capabilities the persistence and discovery layers consume from the shared store.
///
/// Every operation addresses a fully built key (see [`KeySpace`](crate::store::KeySpace)).
/// Backends must be safe to share between the controller and any number of
/// executor processes.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    // ------------------------------------------------------------------
    // Namespaced map
    // ------------------------------------------------------------------

    /// Get a field of the map stored at `key`.
    async fn map_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite a field of the map stored at `key`.
    async fn map_put(&self, key: &str, field: &str, value: String) -> Result<(), StoreError>;

    /// Insert a field that stops being readable once `ttl` has elapsed.
    async fn map_put_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Remove a field, returning whether it was present.
    async fn map_remove(&self, key: &str, field: &str) -> Result<bool, StoreError>;

    /// Number of live fields in the map.
    async fn map_len(&self, key: &str) -> Result<usize, StoreError>;

    /// All live values of the map, in no particular order.
    async fn map_values(&self, key: &str) -> Result<Vec<String>, StoreError>;

    // ------------------------------------------------------------------
    // Ordered multimap bucket (one list per key)
    // ------------------------------------------------------------------

    /// Append a value and return the new length of the list.
    async fn list_push(&self, key: &str, value: String) -> Result<usize, StoreError>;

    /// Value at `index`, if any.
    async fn list_get(&self, key: &str, index: usize) -> Result<Option<String>, StoreError>;

    /// Values in the half-open range `[from, to)`, clamped to the list length.
    async fn list_range(&self, key: &str, from: usize, to: usize)
    -> Result<Vec<String>, StoreError>;

    /// Length of the list (zero when absent).
    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Remove the first occurrence of `value`, returning whether one was removed.
    async fn list_remove(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Keep only the newest `keep_last` values in one step, returning how many
    /// were dropped.
    async fn list_trim(&self, key: &str, keep_last: usize) -> Result<usize, StoreError>;

    /// Read the whole list and delete it in one step.
    async fn list_take_all(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Delete the list.
    async fn list_delete(&self, key: &str) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Publish / subscribe
    // ------------------------------------------------------------------

    /// Publish a payload and return the number of subscribers that received it.
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError>;

    /// Subscribe to a channel. The subscription is active once this returns.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;

    // ------------------------------------------------------------------
    // Counting wait primitive
    // ------------------------------------------------------------------

    /// Add `permits` signals to the named semaphore, creating it when needed.
    async fn semaphore_release(&self, name: &str, permits: usize) -> Result<(), StoreError>;

    /// Wait until `permits` signals are available or `timeout` elapses.
    ///
    /// Returns `true` when all permits were obtained.
    async fn semaphore_acquire(
        &self,
        name: &str,
        permits: usize,
        timeout: Duration,
    ) -> Result<bool, StoreError>;

    /// Drop the backing state of the named semaphore.
    async fn semaphore_delete(&self, name: &str) -> Result<(), StoreError>;
}
