//! Job definitions and script revisions.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::JobGroup;

/// Version label given to revisions created through job add/update.
pub const DEFAULT_SCRIPT_VERSION: &str = "default";

/// How a job is run by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobType {
    /// Runs a script body stored in the revision history
    Script,
    /// Invokes a job handler compiled into the executor
    Bean,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Script => write!(f, "SCRIPT"),
            JobType::Bean => write!(f, "BEAN"),
        }
    }
}

/// A persisted job definition.
///
/// `script` is transient: it is never stored on the definition itself and is
/// re-attached from the latest revision when a job is looked up by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub group: Option<JobGroup>,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl JobInfo {
    pub fn new(name: impl Into<String>, job_type: JobType) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            desc: None,
            job_type,
            group: None,
            cron: None,
            param: None,
            script: None,
        }
    }

    pub fn with_group(mut self, group: JobGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_cron(mut self, cron: impl Into<String>) -> Self {
        self.cron = Some(cron.into());
        self
    }
}

/// One revision of a job's script body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobScript {
    #[serde(default)]
    pub id: String,
    pub job_id: String,
    pub script: String,
    pub time: Timestamp,
    pub version: String,
}

impl JobScript {
    /// A revision not yet stored; id and time are assigned on append.
    pub fn new(
        job_id: impl Into<String>,
        script: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            job_id: job_id.into(),
            script: script.into(),
            time: Timestamp::now(),
            version: version.into(),
        }
    }
}
