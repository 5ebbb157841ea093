//! Executor self-description and its job groups.

use serde::{Deserialize, Serialize};

/// A named binding of one job handler to the executor that hosts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobGroup {
    /// Same as `job_key`
    pub id: String,
    pub job_key: String,
    pub job_desc: String,
    /// Shared key of the owning executor
    pub group_key: String,
}

impl JobGroup {
    pub fn new(
        group_key: impl Into<String>,
        job_key: impl Into<String>,
        job_desc: impl Into<String>,
    ) -> Self {
        let job_key = job_key.into();
        Self {
            id: job_key.clone(),
            job_key,
            job_desc: job_desc.into(),
            group_key: group_key.into(),
        }
    }
}

/// Self-description of one running worker process.
///
/// Built once at startup and published in answer to discovery probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecutor {
    pub id: String,
    pub name: String,
    pub key: String,
    /// `host:port`
    pub address: String,
    #[serde(default)]
    pub groups: Vec<JobGroup>,
}
