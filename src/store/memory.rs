//! In-process store backed by concurrent maps and tokio primitives.
//!
//! Gives single-process deployments and tests the same semantics the Redis
//! backend provides across processes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream;
use tokio::sync::{Semaphore, broadcast};
use tokio::time::Instant;

use crate::store::{StoreBackend, StoreError, Subscription};

const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// An unused semaphore is dropped this long after its last release or wait.
const SEMAPHORE_EXPIRY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct MapEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MapEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

struct SemaphoreSlot {
    semaphore: Arc<Semaphore>,
    expires_at: Instant,
}

/// In-memory implementation of [`StoreBackend`].
///
/// Expired map fields, maps left without live fields and idle semaphores are
/// swept whenever a field with a TTL is written or a semaphore is released.
pub struct MemoryStore {
    maps: DashMap<String, HashMap<String, MapEntry>>,
    lists: DashMap<String, Vec<String>>,
    topics: DashMap<String, broadcast::Sender<String>>,
    semaphores: DashMap<String, SemaphoreSlot>,
    topic_capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_topic_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    pub fn with_topic_capacity(topic_capacity: usize) -> Self {
        Self {
            maps: DashMap::new(),
            lists: DashMap::new(),
            topics: DashMap::new(),
            semaphores: DashMap::new(),
            topic_capacity: topic_capacity.max(1),
        }
    }

    /// Semaphore `name`, kept at least `hold` plus the idle expiry from now.
    fn semaphore(&self, name: &str, hold: Duration) -> Arc<Semaphore> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(hold.saturating_add(SEMAPHORE_EXPIRY))
            .unwrap_or(now + SEMAPHORE_EXPIRY);
        let mut slot = self
            .semaphores
            .entry(name.to_string())
            .or_insert_with(|| SemaphoreSlot {
                semaphore: Arc::new(Semaphore::new(0)),
                expires_at,
            });
        slot.expires_at = slot.expires_at.max(expires_at);
        Arc::clone(&slot.semaphore)
    }

    /// Drop expired fields of a map and return the live ones.
    fn live_entries(&self, key: &str) -> Vec<String> {
        let now = Instant::now();
        let values = match self.maps.get_mut(key) {
            Some(mut map) => {
                map.retain(|_, entry| entry.is_live(now));
                map.values().map(|entry| entry.value.clone()).collect()
            }
            None => Vec::new(),
        };
        if values.is_empty() {
            self.maps.remove_if(key, |_, map| map.is_empty());
        }
        values
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.maps.retain(|_, map| {
            map.retain(|_, entry| entry.is_live(now));
            !map.is_empty()
        });
        self.semaphores.retain(|_, slot| slot.expires_at > now);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn map_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self.maps.get(key).and_then(|map| {
            map.get(field)
                .filter(|entry| entry.is_live(now))
                .map(|entry| entry.value.clone())
        }))
    }

    async fn map_put(&self, key: &str, field: &str, value: String) -> Result<(), StoreError> {
        self.maps.entry(key.to_string()).or_default().insert(
            field.to_string(),
            MapEntry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn map_put_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.purge_expired();
        self.maps.entry(key.to_string()).or_default().insert(
            field.to_string(),
            MapEntry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn map_remove(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let removed = self
            .maps
            .get_mut(key)
            .and_then(|mut map| map.remove(field))
            .is_some_and(|entry| entry.is_live(now));
        self.maps.remove_if(key, |_, map| map.is_empty());
        Ok(removed)
    }

    async fn map_len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.live_entries(key).len())
    }

    async fn map_values(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.live_entries(key))
    }

    async fn list_push(&self, key: &str, value: String) -> Result<usize, StoreError> {
        let mut list = self.lists.entry(key.to_string()).or_default();
        list.push(value);
        Ok(list.len())
    }

    async fn list_get(&self, key: &str, index: usize) -> Result<Option<String>, StoreError> {
        Ok(self
            .lists
            .get(key)
            .and_then(|list| list.get(index).cloned()))
    }

    async fn list_range(
        &self,
        key: &str,
        from: usize,
        to: usize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lists
            .get(key)
            .map(|list| {
                let end = to.min(list.len());
                if from >= end {
                    Vec::new()
                } else {
                    list[from..end].to_vec()
                }
            })
            .unwrap_or_default())
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.lists.get(key).map(|list| list.len()).unwrap_or(0))
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let Some(mut list) = self.lists.get_mut(key) else {
            return Ok(false);
        };
        match list.iter().position(|item| item == value) {
            Some(position) => {
                list.remove(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_trim(&self, key: &str, keep_last: usize) -> Result<usize, StoreError> {
        let Some(mut list) = self.lists.get_mut(key) else {
            return Ok(0);
        };
        let excess = list.len().saturating_sub(keep_last);
        list.drain(..excess);
        Ok(excess)
    }

    async fn list_take_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lists
            .remove(key)
            .map(|(_, list)| list)
            .unwrap_or_default())
    }

    async fn list_delete(&self, key: &str) -> Result<(), StoreError> {
        self.lists.remove(key);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError> {
        let sender = self.topics.get(channel).map(|sender| sender.clone());
        // A send without receivers is not an error for a topic
        Ok(sender
            .and_then(|sender| sender.send(payload.to_string()).ok())
            .unwrap_or(0))
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let receiver = self
            .topics
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.topic_capacity).0)
            .subscribe();

        let stream = stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Topic subscriber lagged behind");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn semaphore_release(&self, name: &str, permits: usize) -> Result<(), StoreError> {
        self.purge_expired();
        self.semaphore(name, Duration::ZERO).add_permits(permits);
        Ok(())
    }

    async fn semaphore_acquire(
        &self,
        name: &str,
        permits: usize,
        timeout: Duration,
    ) -> Result<bool, StoreError> {
        if permits == 0 {
            return Ok(true);
        }
        let permits = u32::try_from(permits)
            .map_err(|_| StoreError::Operation(format!("too many permits: {}", permits)))?;
        let semaphore = self.semaphore(name, timeout);

        match tokio::time::timeout(timeout, semaphore.acquire_many(permits)).await {
            Ok(Ok(permit)) => {
                permit.forget();
                Ok(true)
            }
            Ok(Err(_)) | Err(_) => Ok(false),
        }
    }

    async fn semaphore_delete(&self, name: &str) -> Result<(), StoreError> {
        self.semaphores.remove(name);
        Ok(())
    }
}
