use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DiscoveryConfig;
use crate::error::{AppError, AppResult};
use crate::models::JobExecutor;
use crate::store::{StoreManager, decode};

/// Controller side of executor discovery.
///
/// Every call runs one broadcast round: a fresh correlation id is published,
/// live executors answer into a map scoped to that id, and the caller waits
/// until all of them signalled or the discovery window closed. Whatever was
/// collected by then is the answer; a closed window is not an error.
#[derive(Clone)]
pub struct ExecutorDiscovery {
    store: StoreManager,
    timeout: Duration,
    cancellation: Option<CancellationToken>,
}

impl ExecutorDiscovery {
    pub fn new(store: StoreManager, config: &DiscoveryConfig) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(config.timeout_secs),
            cancellation: None,
        }
    }

    /// Override the discovery window.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// End waits early once `token` is cancelled; partial results are kept.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of executors that answered the probe.
    pub async fn count_executors(&self) -> AppResult<usize> {
        let Some(responses) = self.probe().await? else {
            return Ok(0);
        };

        self.store
            .backend()
            .map_len(&responses)
            .await
            .map_err(|e| AppError::store("count executor responses", e))
    }

    /// Self-descriptions of the executors that answered the probe.
    pub async fn list_executors(&self) -> AppResult<Vec<JobExecutor>> {
        let Some(responses) = self.probe().await? else {
            return Ok(Vec::new());
        };

        let values = self
            .store
            .backend()
            .map_values(&responses)
            .await
            .map_err(|e| AppError::store("read executor responses", e))?;

        let executors = values
            .iter()
            .filter_map(|raw| match decode::<JobExecutor>(raw) {
                Ok(executor) => Some(executor),
                Err(e) => {
                    warn!(error = %e, "Ignoring undecodable executor response");
                    None
                }
            })
            .collect();
        Ok(executors)
    }

    /// Broadcast one probe and wait for the answers.
    ///
    /// Returns the key of the response map, or `None` when nobody listens.
    async fn probe(&self) -> AppResult<Option<String>> {
        let backend = self.store.backend();
        let keys = self.store.keys();
        let correlation_id = Uuid::new_v4().simple().to_string();

        let listeners = backend
            .publish(&keys.discovery_topic(), &correlation_id)
            .await
            .map_err(|e| AppError::store("publish discovery probe", e))?;
        if listeners == 0 {
            debug!(%correlation_id, "No executor is listening for discovery probes");
            return Ok(None);
        }

        let semaphore = keys.discovery_semaphore(&correlation_id);
        let acquire = backend.semaphore_acquire(&semaphore, listeners, self.timeout);
        let completed = match &self.cancellation {
            Some(token) => tokio::select! {
                result = acquire => result,
                _ = token.cancelled() => {
                    info!(%correlation_id, "Discovery wait cancelled, using partial responses");
                    Ok(false)
                }
            },
            None => acquire.await,
        }
        .map_err(|e| AppError::store("await discovery responses", e))?;

        if !completed {
            warn!(
                %correlation_id,
                listeners,
                timeout_ms = self.timeout.as_millis() as u64,
                "Discovery window closed before every executor answered"
            );
        }

        backend
            .semaphore_delete(&semaphore)
            .await
            .map_err(|e| AppError::store("delete discovery semaphore", e))?;

        Ok(Some(keys.discovery_responses(&correlation_id)))
    }
}
