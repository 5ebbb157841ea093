use crate::config::DeclaredJob;

/// A job handler hosted by an executor process.
///
/// Running the job is the execution engine's business; the registry only needs
/// the declaration each handler carries.
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Key the handler is registered under, `None` when the handler was never
    /// declared and must be skipped.
    fn job_key(&self) -> Option<&str>;

    /// Optional description
    fn description(&self) -> &str {
        ""
    }
}

/// Handler declared in the `executor.jobs` configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredHandler {
    key: String,
    desc: String,
}

impl ConfiguredHandler {
    pub fn new(key: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            desc: desc.into(),
        }
    }
}

impl From<&DeclaredJob> for ConfiguredHandler {
    fn from(job: &DeclaredJob) -> Self {
        Self::new(job.key.trim(), job.desc.as_str())
    }
}

impl JobHandler for ConfiguredHandler {
    fn job_key(&self) -> Option<&str> {
        Some(self.key.as_str()).filter(|key| !key.is_empty())
    }

    fn description(&self) -> &str {
        &self.desc
    }
}
