//! Execution history: records, their status stream, and the id locator.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Which phase of an execution a status entry reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPhase {
    /// Controller handing the job to an executor
    Dispatch,
    /// Executor running the job
    Execute,
}

/// Outcome reported by a status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Running,
    Success,
    Fail,
}

/// Summary of one phase, filled from the status stream at read time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub state: Option<RecordState>,
    pub time: Option<Timestamp>,
    pub msg: Option<String>,
}

/// One logged attempt to run a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecuteRecord {
    #[serde(default)]
    pub id: String,
    pub job_id: String,
    #[serde(default)]
    pub job_name: Option<String>,
    /// Group the record was indexed under when it was added
    #[serde(default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub job_key: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    pub execute_at: Timestamp,
    #[serde(default)]
    pub dispatch: PhaseSummary,
    #[serde(default)]
    pub execute: PhaseSummary,
    /// Attached at read time, never stored with the record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub record_statuses: Vec<JobRecordStatus>,
}

impl JobExecuteRecord {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            job_id: job_id.into(),
            job_name: None,
            group_key: None,
            job_key: None,
            param: None,
            execute_at: Timestamp::now(),
            dispatch: PhaseSummary::default(),
            execute: PhaseSummary::default(),
            record_statuses: Vec::new(),
        }
    }

    /// Attach the status stream, applying each entry to the phase summaries.
    pub fn attach_statuses(&mut self, statuses: Vec<JobRecordStatus>) {
        for status in &statuses {
            status.fill(self);
        }
        self.record_statuses = statuses;
    }
}

/// One status or progress update for an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecordStatus {
    /// Id of the owning execution record
    pub logger_id: String,
    pub phase: StatusPhase,
    pub state: RecordState,
    pub time: Timestamp,
    #[serde(default)]
    pub msg: Option<String>,
}

impl JobRecordStatus {
    pub fn new(logger_id: impl Into<String>, phase: StatusPhase, state: RecordState) -> Self {
        Self {
            logger_id: logger_id.into(),
            phase,
            state,
            time: Timestamp::now(),
            msg: None,
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Apply this entry to the matching phase of `record`.
    ///
    /// Entries arrive in no guaranteed order, so a summary is only replaced by
    /// an entry at least as recent as the one it holds.
    pub fn fill(&self, record: &mut JobExecuteRecord) {
        let summary = match self.phase {
            StatusPhase::Dispatch => &mut record.dispatch,
            StatusPhase::Execute => &mut record.execute,
        };
        if summary.time.is_some_and(|time| time > self.time) {
            return;
        }
        summary.state = Some(self.state);
        summary.time = Some(self.time);
        summary.msg = self.msg.clone();
    }
}

/// Locator of an execution record inside its per-job bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRef {
    /// Bucket identifier (the job id)
    pub key: String,
    /// Position within the bucket
    pub index: usize,
}

impl HashRef {
    pub fn new(key: impl Into<String>, index: usize) -> Self {
        Self {
            key: key.into(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    #[test]
    fn test_fill_keeps_latest_status_per_phase() {
        let mut record = JobExecuteRecord::new("job");
        let earlier = JobRecordStatus::new("r", StatusPhase::Execute, RecordState::Running);
        let mut later = JobRecordStatus::new("r", StatusPhase::Execute, RecordState::Success)
            .with_msg("done");
        later.time = earlier.time + SignedDuration::from_secs(5);

        // Out-of-order attachment still ends on the latest entry
        record.attach_statuses(vec![later.clone(), earlier]);

        assert_eq!(record.execute.state, Some(RecordState::Success));
        assert_eq!(record.execute.msg.as_deref(), Some("done"));
        assert_eq!(record.execute.time, Some(later.time));
        assert_eq!(record.dispatch, PhaseSummary::default());
        assert_eq!(record.record_statuses.len(), 2);
    }

    #[test]
    fn test_statuses_are_not_serialized_when_empty() {
        let record = JobExecuteRecord::new("job");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("recordStatuses"));
    }
}
