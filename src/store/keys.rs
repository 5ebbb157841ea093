//! Key layout shared by every process talking to the same store.

use std::borrow::Cow;

/// Separator between key segments.
pub const SEPARATOR: &str = ":";

/// Secondary dimension an execution record id can be listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordIndex {
    /// Every record, regardless of job.
    Global,
    /// Records of jobs bound to an executor group.
    Group(String),
    /// Records of one job key inside an executor group.
    GroupJob(String, String),
}

/// Builds namespaced keys under a common prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Segments are escaped, so a separator inside a group or job key cannot
    /// shift it into the next segment.
    fn join(&self, parts: &[&str]) -> String {
        let mut key = self.prefix.clone();
        for part in parts {
            key.push_str(SEPARATOR);
            key.push_str(&escape(part));
        }
        key
    }

    /// Topic executors listen on for discovery probes.
    pub fn discovery_topic(&self) -> String {
        self.join(&["executor", "register"])
    }

    /// Map collecting executor descriptions for one probe.
    pub fn discovery_responses(&self, correlation_id: &str) -> String {
        self.join(&["executor", correlation_id])
    }

    /// Semaphore counting responses for one probe.
    pub fn discovery_semaphore(&self, correlation_id: &str) -> String {
        self.join(&["executor", "semaphore", correlation_id])
    }

    pub fn job_info(&self) -> String {
        self.join(&["job_info"])
    }

    pub fn job_info_order(&self) -> String {
        self.join(&["job_info", "order"])
    }

    pub fn job_scripts(&self, job_id: &str) -> String {
        self.join(&["job_script", job_id])
    }

    pub fn job_records(&self, job_id: &str) -> String {
        self.join(&["job_record", job_id])
    }

    pub fn hash_refs(&self) -> String {
        self.join(&["hash_ref"])
    }

    pub fn record_index(&self, index: &RecordIndex) -> String {
        match index {
            RecordIndex::Global => self.join(&["record_index", "global"]),
            RecordIndex::Group(group_key) => self.join(&["record_index", "group", group_key]),
            RecordIndex::GroupJob(group_key, job_key) => {
                self.join(&["record_index", "group_job", group_key, job_key])
            }
        }
    }

    pub fn record_statuses(&self, record_id: &str) -> String {
        self.join(&["job_record_status", record_id])
    }
}

fn escape(segment: &str) -> Cow<'_, str> {
    if segment.contains(['%', ':']) {
        Cow::Owned(segment.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(segment)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("frost")
    }
}
