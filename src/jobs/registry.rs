use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::error::{AppError, AppResult};
use crate::jobs::handler::{ConfiguredHandler, JobHandler};
use crate::models::JobGroup;

/// Bind `handlers` into job groups owned by `group_key`.
///
/// Handlers without a declared key are skipped with a warning. The resulting
/// list follows handler order; a repeated job key fails the whole batch.
pub fn build_groups(group_key: &str, handlers: &[Arc<dyn JobHandler>]) -> AppResult<Vec<JobGroup>> {
    let mut seen = HashSet::new();
    let mut groups = Vec::with_capacity(handlers.len());

    for handler in handlers {
        let Some(job_key) = handler.job_key() else {
            warn!(group_key, handler = ?handler, "Job handler has no declared job key, skipping");
            continue;
        };

        if !seen.insert(job_key.to_string()) {
            return Err(AppError::DuplicateJobKey {
                job_key: job_key.to_string(),
                group_key: group_key.to_string(),
            });
        }

        debug!(group_key, job_key, "Registered job handler");
        groups.push(JobGroup::new(group_key, job_key, handler.description()));
    }

    Ok(groups)
}

/// Job groups of the local executor, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGroupRegistry {
    group_key: String,
    groups: Vec<JobGroup>,
}

impl JobGroupRegistry {
    pub fn new(group_key: impl Into<String>, handlers: &[Arc<dyn JobHandler>]) -> AppResult<Self> {
        let group_key = group_key.into();
        let groups = build_groups(&group_key, handlers)?;
        Ok(Self { group_key, groups })
    }

    /// Registry for the handlers declared under `executor.jobs`, grouped by
    /// the executor key.
    pub fn from_config(config: &ExecutorConfig) -> AppResult<Self> {
        let handlers: Vec<Arc<dyn JobHandler>> = config
            .jobs
            .iter()
            .map(|job| Arc::new(ConfiguredHandler::from(job)) as Arc<dyn JobHandler>)
            .collect();
        Self::new(config.key.as_str(), &handlers)
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn groups(&self) -> &[JobGroup] {
        &self.groups
    }

    pub fn get(&self, job_key: &str) -> Option<&JobGroup> {
        self.groups.iter().find(|group| group.job_key == job_key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
