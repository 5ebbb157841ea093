//! Repository layer over the shared store.
//!
//! Provides job definitions with their script history and the indexed
//! execution record history.

mod job_repo;
mod record_repo;

pub use job_repo::{JobRepository, SCRIPT_HISTORY_LIMIT};
pub use record_repo::{JobRecordRepository, RecordFilter};

use crate::store::StoreManager;

/// Aggregates all repositories for convenient access.
///
/// Since `StoreManager` shares its backend through an `Arc`, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub jobs: JobRepository,
    pub records: JobRecordRepository,
}

impl Repositories {
    /// Creates a new Repositories instance with all repositories initialized.
    pub fn new(store: StoreManager) -> Self {
        let jobs = JobRepository::new(store.clone());
        Self {
            records: JobRecordRepository::new(store, jobs.clone()),
            jobs,
        }
    }
}
