//! Executor discovery over the store's publish/subscribe topic.
//!
//! The controller publishes a correlation id on `{prefix}:executor:register`.
//! Each listening executor writes its [`JobExecutor`](crate::models::JobExecutor)
//! into `{prefix}:executor:{id}` and releases one permit on
//! `{prefix}:executor:semaphore:{id}`. The controller waits for as many permits
//! as the publish reached subscribers, bounded by the discovery window.

mod probe;
mod responder;

pub use probe::ExecutorDiscovery;
pub use responder::DiscoveryResponder;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    use crate::config::DiscoveryConfig;
    use crate::models::{JobExecutor, JobGroup};
    use crate::store::StoreManager;

    fn executor(name: &str) -> Arc<JobExecutor> {
        Arc::new(JobExecutor {
            id: format!("{}-id", name),
            name: name.to_string(),
            key: "billing".to_string(),
            address: "127.0.0.1:20000".to_string(),
            groups: vec![JobGroup::new("billing", "invoice", "")],
        })
    }

    async fn start_responder(
        store: &StoreManager,
        name: &str,
        token: &CancellationToken,
    ) -> JoinHandle<()> {
        DiscoveryResponder::new(store.clone(), executor(name), &DiscoveryConfig::default())
            .spawn(token.child_token())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_every_listening_executor_is_discovered() {
        let store = StoreManager::in_memory();
        let token = CancellationToken::new();
        for name in ["a", "b", "c"] {
            start_responder(&store, name, &token).await;
        }
        let discovery = ExecutorDiscovery::new(store, &DiscoveryConfig::default());

        assert_eq!(discovery.count_executors().await.unwrap(), 3);

        let mut names: Vec<_> = discovery
            .list_executors()
            .await
            .unwrap()
            .into_iter()
            .map(|executor| executor.name)
            .collect();
        names.sort();
        assert_eq!(names, ["a", "b", "c"]);
        token.cancel();
    }

    #[tokio::test]
    async fn test_no_listeners_returns_without_waiting() {
        let store = StoreManager::in_memory();
        let discovery = ExecutorDiscovery::new(store, &DiscoveryConfig::default())
            .with_timeout(Duration::from_secs(60));

        let count = tokio::time::timeout(Duration::from_secs(1), discovery.count_executors())
            .await
            .expect("probe without listeners must not wait out the window")
            .unwrap();
        assert_eq!(count, 0);
        assert!(discovery.list_executors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_silent_listener_yields_partial_result() {
        let store = StoreManager::in_memory();
        let token = CancellationToken::new();
        start_responder(&store, "alive", &token).await;
        // Subscribed but never answers
        let _silent = store
            .backend()
            .subscribe(&store.keys().discovery_topic())
            .await
            .unwrap();

        let discovery = ExecutorDiscovery::new(store, &DiscoveryConfig::default())
            .with_timeout(Duration::from_millis(200));
        let executors = discovery.list_executors().await.unwrap();

        assert_eq!(executors.len(), 1);
        assert_eq!(executors[0].name, "alive");
        token.cancel();
    }

    #[tokio::test]
    async fn test_cancellation_ends_the_wait_early() {
        let store = StoreManager::in_memory();
        let _silent = store
            .backend()
            .subscribe(&store.keys().discovery_topic())
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        let discovery = ExecutorDiscovery::new(store, &DiscoveryConfig::default())
            .with_timeout(Duration::from_secs(60))
            .with_cancellation(cancel.clone());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let count = tokio::time::timeout(Duration::from_secs(5), discovery.count_executors())
            .await
            .expect("cancelled probe must return")
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_stopped_responder_no_longer_counts() {
        let store = StoreManager::in_memory();
        let token = CancellationToken::new();
        let handle = start_responder(&store, "short-lived", &token).await;
        let discovery = ExecutorDiscovery::new(store, &DiscoveryConfig::default());
        assert_eq!(discovery.count_executors().await.unwrap(), 1);

        token.cancel();
        handle.await.unwrap();

        assert_eq!(discovery.count_executors().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_responses_are_scoped_to_their_probe() {
        let store = StoreManager::in_memory();
        let responder =
            DiscoveryResponder::new(store.clone(), executor("direct"), &DiscoveryConfig::default());
        responder.respond("probe-1").await.unwrap();

        let keys = store.keys();
        let backend = store.backend();
        assert_eq!(backend.map_len(&keys.discovery_responses("probe-1")).await.unwrap(), 1);
        assert_eq!(backend.map_len(&keys.discovery_responses("probe-2")).await.unwrap(), 0);
        assert!(
            backend
                .semaphore_acquire(&keys.discovery_semaphore("probe-1"), 1, Duration::ZERO)
                .await
                .unwrap()
        );
    }
}
