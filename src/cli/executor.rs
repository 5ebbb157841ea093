//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::discovery::{DiscoveryResponder, ExecutorDiscovery};
use crate::error::{AppError, AppResult};
use crate::jobs::JobGroupRegistry;
use crate::models::JobExecutor;
use crate::store::StoreManager;

/// Execute a CLI command with the given settings
///
/// `shutdown` ends a running executor and cuts short a discovery wait.
pub async fn execute_command(
    cli: &Cli,
    settings: Settings,
    shutdown: CancellationToken,
) -> AppResult<()> {
    match &cli.command {
        Commands::Check => {
            settings.validate()?;
            println!(
                "Configuration is valid (store: {:?}, executor: {} [{}])",
                settings.store.backend, settings.executor.name, settings.executor.key
            );
            Ok(())
        }
        Commands::Executor => {
            let store = connect(&settings).await?;
            run_executor(store, &settings, shutdown).await
        }
        Commands::Executors { count, timeout } => {
            let store = connect(&settings).await?;
            let mut discovery =
                ExecutorDiscovery::new(store, &settings.discovery).with_cancellation(shutdown);
            if let Some(secs) = timeout {
                discovery = discovery.with_timeout(Duration::from_secs(*secs));
            }
            println!("{}", discover(&discovery, *count).await?);
            Ok(())
        }
    }
}

async fn connect(settings: &Settings) -> AppResult<StoreManager> {
    StoreManager::new(&settings.store)
        .await
        .map_err(|e| AppError::store("connect to store", e))
}

/// Answer discovery probes as the configured executor until `shutdown` fires.
pub async fn run_executor(
    store: StoreManager,
    settings: &Settings,
    shutdown: CancellationToken,
) -> AppResult<()> {
    let registry = JobGroupRegistry::from_config(&settings.executor)?;
    let executor = Arc::new(JobExecutor::build(&settings.executor, &registry));

    let handle = DiscoveryResponder::new(store, executor, &settings.discovery)
        .spawn(shutdown.clone())
        .await?;

    shutdown.cancelled().await;
    info!("Shutdown requested, stopping executor");
    handle.await.map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })
}

/// One discovery round rendered for stdout.
async fn discover(discovery: &ExecutorDiscovery, count_only: bool) -> AppResult<String> {
    if count_only {
        return Ok(discovery.count_executors().await?.to_string());
    }

    let executors = discovery.list_executors().await?;
    serde_json::to_string_pretty(&executors).map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })
}
