use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{HashRef, JobExecuteRecord, JobInfo, JobRecordStatus, JobType};
use crate::repositories::job_repo::JobRepository;
use crate::store::{RecordIndex, StoreManager, decode, encode};

/// Selects the records a count or query runs over.
///
/// A job id wins over everything else. Otherwise a group key together with a
/// job key selects that job key's records inside the group, a group key alone
/// selects the group, and anything else falls back to every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub group_key: Option<String>,
    pub job_key: Option<String>,
    pub job_id: Option<String>,
}

impl RecordFilter {
    /// Records of one job
    pub fn job(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Self::default()
        }
    }

    /// Records of one executor group
    pub fn group(group_key: impl Into<String>) -> Self {
        Self {
            group_key: Some(group_key.into()),
            ..Self::default()
        }
    }

    pub fn with_job_key(mut self, job_key: impl Into<String>) -> Self {
        self.job_key = Some(job_key.into());
        self
    }

    fn source(&self) -> RecordSource<'_> {
        if let Some(job_id) = self.job_id.as_deref() {
            return RecordSource::Job(job_id);
        }
        let index = match (&self.group_key, &self.job_key) {
            (Some(group_key), Some(job_key)) => {
                RecordIndex::GroupJob(group_key.clone(), job_key.clone())
            }
            (Some(group_key), None) => RecordIndex::Group(group_key.clone()),
            _ => RecordIndex::Global,
        };
        RecordSource::Index(index)
    }
}

enum RecordSource<'a> {
    /// Primary per-job list holding full records
    Job(&'a str),
    /// Fan-out list holding record ids only
    Index(RecordIndex),
}

/// Fan-out lists a new record of `job` is appended to.
///
/// Bean jobs are reachable by group and by group + job key; other jobs with a
/// group only by group.
fn fan_out(job: &JobInfo) -> Vec<RecordIndex> {
    let mut indexes = vec![RecordIndex::Global];
    if let Some(group) = &job.group {
        indexes.push(RecordIndex::Group(group.group_key.clone()));
        if job.job_type == JobType::Bean {
            indexes.push(RecordIndex::GroupJob(
                group.group_key.clone(),
                group.job_key.clone(),
            ));
        }
    }
    indexes
}

/// Every fan-out list `record` may have been appended to, whatever type its
/// job had back then.
fn candidate_indexes(record: &JobExecuteRecord) -> Vec<RecordIndex> {
    let mut indexes = vec![RecordIndex::Global];
    if let Some(group_key) = &record.group_key {
        indexes.push(RecordIndex::Group(group_key.clone()));
        if let Some(job_key) = &record.job_key {
            indexes.push(RecordIndex::GroupJob(group_key.clone(), job_key.clone()));
        }
    }
    indexes
}

/// Execution history indexed by job, by group and by group + job key.
///
/// Each record is stored once, in the list of its job. A [`HashRef`] per
/// record id locates it there, and the fan-out lists only carry ids. Status
/// entries go to a separate list per record and are attached when a record is
/// read.
#[derive(Clone)]
pub struct JobRecordRepository {
    store: StoreManager,
    jobs: JobRepository,
}

impl JobRecordRepository {
    pub fn new(store: StoreManager, jobs: JobRepository) -> Self {
        Self { store, jobs }
    }

    /// Append a record for an existing job and return its generated id.
    pub async fn add_record(&self, mut record: JobExecuteRecord) -> AppResult<String> {
        let backend = self.store.backend();
        let keys = self.store.keys();

        let job = self
            .jobs
            .get_definition(&record.job_id)
            .await?
            .ok_or_else(|| AppError::not_found("JobInfo", "id", record.job_id.as_str()))?;

        record.id = Uuid::new_v4().to_string();
        record.record_statuses.clear();
        if record.job_name.is_none() {
            record.job_name = Some(job.name.clone());
        }
        record.group_key = job.group.as_ref().map(|group| group.group_key.clone());
        record.job_key = job.group.as_ref().map(|group| group.job_key.clone());

        let payload = encode(&record).map_err(|e| AppError::store("encode execution record", e))?;
        let len = backend
            .list_push(&keys.job_records(&record.job_id), payload)
            .await
            .map_err(|e| AppError::store("append execution record", e))?;

        let hash_ref = HashRef::new(record.job_id.as_str(), len - 1);
        let hash_ref = encode(&hash_ref).map_err(|e| AppError::store("encode record locator", e))?;
        backend
            .map_put(&keys.hash_refs(), &record.id, hash_ref)
            .await
            .map_err(|e| AppError::store("write record locator", e))?;

        for index in fan_out(&job) {
            backend
                .list_push(&keys.record_index(&index), record.id.clone())
                .await
                .map_err(|e| AppError::store("index execution record", e))?;
        }

        debug!(record_id = %record.id, job_id = %record.job_id, position = len - 1, "Added execution record");
        Ok(record.id)
    }

    /// Record with its status entries attached.
    ///
    /// An unknown id is [`AppError::NotFound`]; a locator pointing nowhere is
    /// an [`AppError::AssertionFailure`].
    pub async fn find_by_id(&self, id: &str) -> AppResult<JobExecuteRecord> {
        let backend = self.store.backend();
        let keys = self.store.keys();

        let raw = backend
            .map_get(&keys.hash_refs(), id)
            .await
            .map_err(|e| AppError::store("read record locator", e))?
            .ok_or_else(|| AppError::not_found("JobExecuteRecord", "id", id))?;
        let hash_ref: HashRef =
            decode(&raw).map_err(|e| AppError::store("decode record locator", e))?;

        let raw = backend
            .list_get(&keys.job_records(&hash_ref.key), hash_ref.index)
            .await
            .map_err(|e| AppError::store("read execution record", e))?
            .ok_or_else(|| {
                AppError::assertion(format!(
                    "record {} points at {}[{}] which does not exist",
                    id, hash_ref.key, hash_ref.index
                ))
            })?;
        let mut record: JobExecuteRecord =
            decode(&raw).map_err(|e| AppError::store("decode execution record", e))?;
        if record.id != id {
            return Err(AppError::assertion(format!(
                "record {} points at {}[{}] holding record {}",
                id, hash_ref.key, hash_ref.index, record.id
            )));
        }

        let statuses = self.load_statuses(id).await?;
        record.attach_statuses(statuses);
        Ok(record)
    }

    pub async fn count_records(&self, filter: &RecordFilter) -> AppResult<usize> {
        let backend = self.store.backend();
        let keys = self.store.keys();

        let key = match filter.source() {
            RecordSource::Job(job_id) => keys.job_records(job_id),
            RecordSource::Index(index) => keys.record_index(&index),
        };
        backend
            .list_len(&key)
            .await
            .map_err(|e| AppError::store("count execution records", e))
    }

    /// Records at positions `[from, to)` of the selected list, oldest first.
    ///
    /// `to` is clamped to the list length; an empty or inverted range yields
    /// no records.
    pub async fn query_records(
        &self,
        filter: &RecordFilter,
        from: usize,
        to: usize,
    ) -> AppResult<Vec<JobExecuteRecord>> {
        let backend = self.store.backend();
        let keys = self.store.keys();

        match filter.source() {
            RecordSource::Job(job_id) => {
                let values = backend
                    .list_range(&keys.job_records(job_id), from, to)
                    .await
                    .map_err(|e| AppError::store("read execution records", e))?;

                let mut records = Vec::with_capacity(values.len());
                for raw in values {
                    let mut record: JobExecuteRecord =
                        decode(&raw).map_err(|e| AppError::store("decode execution record", e))?;
                    let statuses = self.load_statuses(&record.id).await?;
                    record.attach_statuses(statuses);
                    records.push(record);
                }
                Ok(records)
            }
            RecordSource::Index(index) => {
                let ids = backend
                    .list_range(&keys.record_index(&index), from, to)
                    .await
                    .map_err(|e| AppError::store("read record index", e))?;

                let mut records = Vec::with_capacity(ids.len());
                for id in ids {
                    match self.find_by_id(&id).await {
                        Ok(record) => records.push(record),
                        Err(e) if e.is_not_found() => {
                            warn!(record_id = %id, index = ?index, "Record index holds a removed record");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(records)
            }
        }
    }

    /// Append a status entry to its record's status list.
    pub async fn add_status(&self, status: &JobRecordStatus) -> AppResult<()> {
        let payload = encode(status).map_err(|e| AppError::store("encode record status", e))?;
        self.store
            .backend()
            .list_push(&self.store.keys().record_statuses(&status.logger_id), payload)
            .await
            .map_err(|e| AppError::store("append record status", e))?;
        Ok(())
    }

    /// Remove every record of a job together with its locator, index entries
    /// and status list. Returns the number of records removed.
    ///
    /// Index entries are resolved from the group each record was written
    /// under, so this works after the job was moved or removed.
    pub async fn remove_records(&self, job_id: &str) -> AppResult<usize> {
        let backend = self.store.backend();
        let keys = self.store.keys();

        let values = backend
            .list_take_all(&keys.job_records(job_id))
            .await
            .map_err(|e| AppError::store("remove execution records", e))?;
        if values.is_empty() {
            return Ok(0);
        }

        for raw in &values {
            let record: JobExecuteRecord =
                decode(raw).map_err(|e| AppError::store("decode execution record", e))?;

            backend
                .map_remove(&keys.hash_refs(), &record.id)
                .await
                .map_err(|e| AppError::store("remove record locator", e))?;

            for index in candidate_indexes(&record) {
                backend
                    .list_remove(&keys.record_index(&index), &record.id)
                    .await
                    .map_err(|e| AppError::store("unindex execution record", e))?;
            }

            backend
                .list_delete(&keys.record_statuses(&record.id))
                .await
                .map_err(|e| AppError::store("remove record statuses", e))?;
        }

        debug!(%job_id, removed = values.len(), "Removed execution records");
        Ok(values.len())
    }

    async fn load_statuses(&self, record_id: &str) -> AppResult<Vec<JobRecordStatus>> {
        let values = self
            .store
            .backend()
            .list_range(&self.store.keys().record_statuses(record_id), 0, usize::MAX)
            .await
            .map_err(|e| AppError::store("read record statuses", e))?;

        values
            .iter()
            .map(|raw| decode(raw).map_err(|e| AppError::store("decode record status", e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobGroup, RecordState, StatusPhase};
    use proptest::prelude::*;

    struct Fixture {
        store: StoreManager,
        jobs: JobRepository,
        records: JobRecordRepository,
    }

    fn fixture() -> Fixture {
        let store = StoreManager::in_memory();
        let jobs = JobRepository::new(store.clone());
        let records = JobRecordRepository::new(store.clone(), jobs.clone());
        Fixture {
            store,
            jobs,
            records,
        }
    }

    async fn bean_job(jobs: &JobRepository, group: &str, job_key: &str) -> String {
        let info = JobInfo::new(job_key, JobType::Bean).with_group(JobGroup::new(group, job_key, ""));
        jobs.add_job(info).await.unwrap()
    }

    async fn script_job(jobs: &JobRepository, group: &str) -> String {
        let info = JobInfo::new("script", JobType::Script)
            .with_group(JobGroup::new(group, "script", ""))
            .with_script("echo");
        jobs.add_job(info).await.unwrap()
    }

    #[tokio::test]
    async fn test_bean_record_reachable_from_every_index() {
        let f = fixture();
        let job_id = bean_job(&f.jobs, "billing", "invoice").await;
        let record_id = f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();

        let by_group = RecordFilter::group("billing");
        let by_group_job = RecordFilter::group("billing").with_job_key("invoice");
        let by_job = RecordFilter::job(job_id.as_str());
        for filter in [&by_group, &by_group_job, &by_job, &RecordFilter::default()] {
            assert_eq!(f.records.count_records(filter).await.unwrap(), 1, "{:?}", filter);
        }

        assert_eq!(f.records.remove_records(&job_id).await.unwrap(), 1);

        for filter in [&by_group, &by_group_job, &by_job, &RecordFilter::default()] {
            assert_eq!(f.records.count_records(filter).await.unwrap(), 0, "{:?}", filter);
        }
        assert!(f.records.find_by_id(&record_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_script_record_is_only_group_queryable() {
        let f = fixture();
        let job_id = script_job(&f.jobs, "ops").await;
        f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();

        let by_group = RecordFilter::group("ops");
        assert_eq!(f.records.count_records(&by_group).await.unwrap(), 1);
        let by_group_job = RecordFilter::group("ops").with_job_key("script");
        assert_eq!(f.records.count_records(&by_group_job).await.unwrap(), 0);
        assert_eq!(f.records.count_records(&RecordFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_job_key_without_group_uses_global_index() {
        let f = fixture();
        let job_id = bean_job(&f.jobs, "billing", "invoice").await;
        f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();
        let other = bean_job(&f.jobs, "billing", "refund").await;
        f.records.add_record(JobExecuteRecord::new(other.as_str())).await.unwrap();

        let filter = RecordFilter {
            job_key: Some("invoice".to_string()),
            ..RecordFilter::default()
        };
        assert_eq!(f.records.count_records(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_add_record_for_unknown_job_writes_nothing() {
        let f = fixture();
        let err = f
            .records
            .add_record(JobExecuteRecord::new("missing"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.records.count_records(&RecordFilter::default()).await.unwrap(), 0);
        assert_eq!(f.records.count_records(&RecordFilter::job("missing")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_id_attaches_and_fills_statuses() {
        let f = fixture();
        let job_id = bean_job(&f.jobs, "billing", "invoice").await;
        let record_id = f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();

        let dispatched = JobRecordStatus::new(record_id.as_str(), StatusPhase::Dispatch, RecordState::Success);
        let executed = JobRecordStatus::new(record_id.as_str(), StatusPhase::Execute, RecordState::Fail)
            .with_msg("exit code 2");
        f.records.add_status(&dispatched).await.unwrap();
        f.records.add_status(&executed).await.unwrap();

        let record = f.records.find_by_id(&record_id).await.unwrap();
        assert_eq!(record.id, record_id);
        assert_eq!(record.job_name.as_deref(), Some("invoice"));
        assert_eq!(record.record_statuses.len(), 2);
        assert_eq!(record.dispatch.state, Some(RecordState::Success));
        assert_eq!(record.execute.state, Some(RecordState::Fail));
        assert_eq!(record.execute.msg.as_deref(), Some("exit code 2"));

        let by_job = f
            .records
            .query_records(&RecordFilter::job(job_id.as_str()), 0, 10)
            .await
            .unwrap();
        assert_eq!(by_job, vec![record]);
    }

    #[tokio::test]
    async fn test_dangling_locator_is_an_assertion_failure() {
        let f = fixture();
        let locator = encode(&HashRef::new("job", 7)).unwrap();
        f.store
            .backend()
            .map_put(&f.store.keys().hash_refs(), "orphan", locator)
            .await
            .unwrap();

        let err = f.records.find_by_id("orphan").await.unwrap_err();
        assert!(matches!(err, AppError::AssertionFailure { .. }));
    }

    #[tokio::test]
    async fn test_inverted_or_out_of_range_pages_are_empty() {
        let f = fixture();
        let job_id = bean_job(&f.jobs, "billing", "invoice").await;
        for _ in 0..4 {
            f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();
        }

        for filter in [RecordFilter::group("billing"), RecordFilter::job(job_id.as_str())] {
            assert!(f.records.query_records(&filter, 5, 3).await.unwrap().is_empty());
            assert!(f.records.query_records(&filter, 10, 20).await.unwrap().is_empty());
            assert_eq!(f.records.query_records(&filter, 1, 100).await.unwrap().len(), 3);
        }
    }

    #[tokio::test]
    async fn test_remove_records_clears_statuses_and_leaves_other_jobs() {
        let f = fixture();
        let job_id = bean_job(&f.jobs, "billing", "invoice").await;
        let other_id = bean_job(&f.jobs, "billing", "refund").await;
        let record_id = f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();
        let kept_id = f.records.add_record(JobExecuteRecord::new(other_id.as_str())).await.unwrap();
        f.records
            .add_status(&JobRecordStatus::new(record_id.as_str(), StatusPhase::Execute, RecordState::Running))
            .await
            .unwrap();

        f.records.remove_records(&job_id).await.unwrap();

        let statuses_key = f.store.keys().record_statuses(&record_id);
        assert_eq!(f.store.backend().list_len(&statuses_key).await.unwrap(), 0);
        assert_eq!(f.records.find_by_id(&kept_id).await.unwrap().id, kept_id);
        assert_eq!(f.records.count_records(&RecordFilter::group("billing")).await.unwrap(), 1);
        assert_eq!(f.records.remove_records(&job_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_records_after_job_removal_cleans_every_index() {
        let f = fixture();
        let job_id = bean_job(&f.jobs, "billing", "invoice").await;
        let record_id = f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();
        f.jobs.remove_job(&job_id).await.unwrap();

        assert_eq!(f.records.remove_records(&job_id).await.unwrap(), 1);
        let by_group = RecordFilter::group("billing");
        let by_group_job = RecordFilter::group("billing").with_job_key("invoice");
        for filter in [&by_group, &by_group_job, &RecordFilter::default()] {
            assert_eq!(f.records.count_records(filter).await.unwrap(), 0, "{:?}", filter);
        }
        assert!(f.records.find_by_id(&record_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remove_records_after_group_change_cleans_original_group() {
        let f = fixture();
        let job_id = bean_job(&f.jobs, "billing", "invoice").await;
        let record_id = f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();
        assert_eq!(
            f.records.find_by_id(&record_id).await.unwrap().group_key.as_deref(),
            Some("billing")
        );

        let mut moved = f.jobs.find_by_id(&job_id).await.unwrap().unwrap();
        moved.group = Some(JobGroup::new("ops", "invoice", ""));
        f.jobs.update_job(moved).await.unwrap();
        f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap();
        assert_eq!(f.records.count_records(&RecordFilter::group("ops")).await.unwrap(), 1);

        assert_eq!(f.records.remove_records(&job_id).await.unwrap(), 2);
        for group in ["billing", "ops"] {
            let by_group = RecordFilter::group(group);
            let by_group_job = RecordFilter::group(group).with_job_key("invoice");
            assert_eq!(f.records.count_records(&by_group).await.unwrap(), 0, "{group}");
            assert_eq!(f.records.count_records(&by_group_job).await.unwrap(), 0, "{group}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn property_query_matches_clamped_range(records in 0usize..10, from in 0usize..15, to in 0usize..15) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let f = fixture();
                let job_id = bean_job(&f.jobs, "billing", "invoice").await;
                let mut ids = Vec::new();
                for _ in 0..records {
                    ids.push(f.records.add_record(JobExecuteRecord::new(job_id.as_str())).await.unwrap());
                }

                let end = to.min(records);
                let expected: &[String] = if from < end { &ids[from..end] } else { &[] };
                for filter in [RecordFilter::group("billing").with_job_key("invoice"), RecordFilter::job(job_id.as_str())] {
                    let page: Vec<_> = f
                        .records
                        .query_records(&filter, from, to)
                        .await
                        .unwrap()
                        .into_iter()
                        .map(|record| record.id)
                        .collect();
                    prop_assert_eq!(page.as_slice(), expected);
                }
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
