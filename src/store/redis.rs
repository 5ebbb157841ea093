//! Redis store implementation using bb8 connection pool.
//!
//! Maps are Redis hashes, multimap buckets are Redis lists, the topic is plain
//! PUBLISH/SUBSCRIBE and the counting semaphore is an INCR counter that the
//! waiter polls until it reaches the required number of permits.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};

use crate::config::settings::RedisStoreConfig;
use crate::store::{StoreBackend, StoreError, Subscription};

type RedisPool = Pool<Client>;

/// Interval between semaphore counter polls.
const SEMAPHORE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Semaphore counters outlive an abandoned wait by this much at most.
const SEMAPHORE_EXPIRY_SECS: i64 = 300;

/// Redis-based store with bb8 connection pool.
pub struct RedisStore {
    client: Client,
    pool: RedisPool,
}

impl RedisStore {
    pub async fn new(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| StoreError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout))
            .build(client.clone())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { client, pool })
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    /// Clamp a half-open range to the inclusive stop index LRANGE expects.
    fn lrange_bounds(from: usize, to: usize) -> Option<(isize, isize)> {
        if to <= from {
            return None;
        }
        let start = isize::try_from(from).ok()?;
        let stop = isize::try_from(to - 1).unwrap_or(isize::MAX);
        Some((start, stop))
    }
}

#[async_trait]
impl StoreBackend for RedisStore {
    async fn map_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.hget(key, field).await?)
    }

    async fn map_put(&self, key: &str, field: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn map_put_with_ttl(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        let seconds = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);

        // Expiry applies to the whole hash; every writer refreshes it
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::pipe()
            .atomic()
            .hset(key, field, value)
            .ignore()
            .expire(key, seconds)
            .ignore()
            .query_async::<()>(conn_ref)
            .await?;
        Ok(())
    }

    async fn map_remove(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let removed: usize = conn_ref.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn map_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.hlen(key).await?)
    }

    async fn map_values(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.hvals(key).await?)
    }

    async fn list_push(&self, key: &str, value: String) -> Result<usize, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.rpush(key, value).await?)
    }

    async fn list_get(&self, key: &str, index: usize) -> Result<Option<String>, StoreError> {
        let index = isize::try_from(index)
            .map_err(|_| StoreError::Operation(format!("list index out of range: {}", index)))?;
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.lindex(key, index).await?)
    }

    async fn list_range(
        &self,
        key: &str,
        from: usize,
        to: usize,
    ) -> Result<Vec<String>, StoreError> {
        let Some((start, stop)) = Self::lrange_bounds(from, to) else {
            return Ok(Vec::new());
        };
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.lrange(key, start, stop).await?)
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.llen(key).await?)
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let removed: usize = conn_ref.lrem(key, 1, value).await?;
        Ok(removed > 0)
    }

    async fn list_trim(&self, key: &str, keep_last: usize) -> Result<usize, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let keep = isize::try_from(keep_last).unwrap_or(isize::MAX);
        // LTRIM with start > stop empties the list
        let (start, stop) = if keep == 0 { (1, 0) } else { (-keep, -1) };
        let (before, after): (usize, usize) = redis::pipe()
            .atomic()
            .llen(key)
            .ltrim(key, start, stop)
            .ignore()
            .llen(key)
            .query_async(conn_ref)
            .await?;
        Ok(before.saturating_sub(after))
    }

    async fn list_take_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let (values,): (Vec<String>,) = redis::pipe()
            .atomic()
            .lrange(key, 0, -1)
            .del(key)
            .ignore()
            .query_async(conn_ref)
            .await?;
        Ok(values)
    }

    async fn list_delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.publish(channel, payload).await?)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        // Subscriptions need a dedicated connection outside the pool
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move {
                match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping undecodable topic payload");
                        None
                    }
                }
            });

        Ok(Box::pin(stream))
    }

    async fn semaphore_release(&self, name: &str, permits: usize) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::pipe()
            .atomic()
            .incr(name, permits)
            .ignore()
            .expire(name, SEMAPHORE_EXPIRY_SECS)
            .ignore()
            .query_async::<()>(conn_ref)
            .await?;
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
        let deadline = tokio::time::Instant::now() + timeout;
        let mut interval = tokio::time::interval(SEMAPHORE_POLL_INTERVAL);

        loop {
            interval.tick().await;
            let available: Option<usize> = {
                let mut conn = self.get_conn().await?;
                let conn_ref: &mut MultiplexedConnection = &mut conn;
                conn_ref.get(name).await?
            };
            if available.unwrap_or(0) >= permits {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }

    async fn semaphore_delete(&self, name: &str) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.del::<_, ()>(name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lrange_bounds_convert_half_open_range() {
        assert_eq!(RedisStore::lrange_bounds(0, 10), Some((0, 9)));
        assert_eq!(RedisStore::lrange_bounds(5, 6), Some((5, 5)));
        assert_eq!(RedisStore::lrange_bounds(5, 5), None);
        assert_eq!(RedisStore::lrange_bounds(5, 3), None);
    }
}
