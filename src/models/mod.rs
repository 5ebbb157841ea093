//! Domain models shared by discovery and persistence.
//!
//! Every model is stored as JSON, so field names follow the camelCase layout
//! the administrative layer reads.

mod executor;
mod job;
mod record;

pub use executor::{JobExecutor, JobGroup};
pub use job::{DEFAULT_SCRIPT_VERSION, JobInfo, JobScript, JobType};
pub use record::{
    HashRef, JobExecuteRecord, JobRecordStatus, PhaseSummary, RecordState, StatusPhase,
};
