use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::error::{AppError, AppResult};
use crate::models::JobExecutor;
use crate::store::{StoreManager, encode};

/// Executor side of discovery: answers every probe with this process's
/// self-description.
#[derive(Clone)]
pub struct DiscoveryResponder {
    store: StoreManager,
    executor: Arc<JobExecutor>,
    response_ttl: Duration,
}

impl DiscoveryResponder {
    pub fn new(store: StoreManager, executor: Arc<JobExecutor>, config: &DiscoveryConfig) -> Self {
        Self {
            store,
            executor,
            response_ttl: Duration::from_secs(config.response_ttl_secs),
        }
    }

    pub fn executor(&self) -> &JobExecutor {
        &self.executor
    }

    /// Write the description under `correlation_id` and signal completion.
    pub async fn respond(&self, correlation_id: &str) -> AppResult<()> {
        let backend = self.store.backend();
        let keys = self.store.keys();
        let payload = encode(self.executor.as_ref())
            .map_err(|e| AppError::store("encode executor description", e))?;

        backend
            .map_put_with_ttl(
                &keys.discovery_responses(correlation_id),
                &self.executor.id,
                payload,
                self.response_ttl,
            )
            .await
            .map_err(|e| AppError::store("write discovery response", e))?;

        backend
            .semaphore_release(&keys.discovery_semaphore(correlation_id), 1)
            .await
            .map_err(|e| AppError::store("signal discovery response", e))?;

        debug!(correlation_id, executor_id = %self.executor.id, "Answered discovery probe");
        Ok(())
    }

    /// Subscribe to the probe topic and answer probes until `token` is cancelled.
    ///
    /// The subscription is active when this returns, so probes published
    /// afterwards are seen by the spawned task.
    pub async fn spawn(self, token: CancellationToken) -> AppResult<JoinHandle<()>> {
        let topic = self.store.keys().discovery_topic();
        let mut probes = self
            .store
            .backend()
            .subscribe(&topic)
            .await
            .map_err(|e| AppError::store("subscribe to discovery topic", e))?;

        info!(
            executor_id = %self.executor.id,
            address = %self.executor.address,
            %topic,
            "Listening for discovery probes"
        );

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!(executor_id = %self.executor.id, "Discovery responder stopped");
                        break;
                    }
                    probe = probes.next() => match probe {
                        Some(correlation_id) => {
                            if let Err(e) = self.respond(&correlation_id).await {
                                warn!(%correlation_id, error = %e, "Failed to answer discovery probe");
                            }
                        }
                        None => {
                            warn!(%topic, "Discovery subscription closed");
                            break;
                        }
                    },
                }
            }
        }))
    }
}
