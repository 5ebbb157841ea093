use jiff::Timestamp;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DEFAULT_SCRIPT_VERSION, JobInfo, JobScript, JobType};
use crate::store::{StoreManager, decode, encode};

/// Number of script revisions kept per job.
pub const SCRIPT_HISTORY_LIMIT: usize = 20;

/// Job definitions plus the bounded script revision history of each job.
///
/// Definitions live in one map keyed by job id; a separate id list keeps
/// insertion order for pagination. Script bodies are never stored on the
/// definition, only as revisions.
#[derive(Clone)]
pub struct JobRepository {
    store: StoreManager,
}

impl JobRepository {
    pub fn new(store: StoreManager) -> Self {
        Self { store }
    }

    /// Store a new definition and return its generated id.
    ///
    /// A script job's body becomes its first revision.
    pub async fn add_job(&self, mut info: JobInfo) -> AppResult<String> {
        let backend = self.store.backend();
        let keys = self.store.keys();

        info.id = Uuid::new_v4().to_string();
        let script = info.script.take();

        if info.job_type == JobType::Script {
            if let Some(script) = script {
                self.add_job_script(JobScript::new(info.id.as_str(), script, DEFAULT_SCRIPT_VERSION))
                    .await?;
            }
        }

        backend
            .list_push(&keys.job_info_order(), info.id.clone())
            .await
            .map_err(|e| AppError::store("index job id", e))?;
        self.put_definition(&info).await?;

        debug!(job_id = %info.id, job_type = %info.job_type, "Added job");
        Ok(info.id)
    }

    /// Overwrite an existing definition.
    ///
    /// A script job carrying a body appends a revision; a bean job loses its
    /// whole script history.
    pub async fn update_job(&self, mut info: JobInfo) -> AppResult<()> {
        if !self.exists(&info.id).await? {
            return Err(AppError::not_found("JobInfo", "id", info.id.as_str()));
        }

        let script = info.script.take();
        match info.job_type {
            JobType::Script => {
                if let Some(script) = script {
                    self.add_job_script(JobScript::new(info.id.as_str(), script, DEFAULT_SCRIPT_VERSION))
                        .await?;
                }
            }
            JobType::Bean => self.remove_job_scripts(&info.id).await?,
        }

        self.put_definition(&info).await?;
        debug!(job_id = %info.id, job_type = %info.job_type, "Updated job");
        Ok(())
    }

    /// Remove a definition and its position in the id order.
    ///
    /// Script history and execution records are left in place.
    pub async fn remove_job(&self, id: &str) -> AppResult<()> {
        let backend = self.store.backend();
        let keys = self.store.keys();

        let removed = backend
            .map_remove(&keys.job_info(), id)
            .await
            .map_err(|e| AppError::store("remove job definition", e))?;
        if !removed {
            return Err(AppError::not_found("JobInfo", "id", id));
        }

        let unindexed = backend
            .list_remove(&keys.job_info_order(), id)
            .await
            .map_err(|e| AppError::store("unindex job id", e))?;
        if !unindexed {
            warn!(job_id = %id, "Removed job was missing from the id order");
        }

        debug!(job_id = %id, "Removed job");
        Ok(())
    }

    /// Definition with its script set to the latest revision, `None` when absent.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<JobInfo>> {
        let Some(mut info) = self.get_definition(id).await? else {
            return Ok(None);
        };

        info.script = self.latest_script(id).await?.map(|revision| revision.script);
        Ok(Some(info))
    }

    /// Definitions at positions `[from, to)` of the id order.
    ///
    /// `to` is clamped to the number of jobs; an empty or inverted range
    /// yields an empty page.
    pub async fn list_page(&self, from: usize, to: usize) -> AppResult<Vec<JobInfo>> {
        let ids = self
            .store
            .backend()
            .list_range(&self.store.keys().job_info_order(), from, to)
            .await
            .map_err(|e| AppError::store("read job id order", e))?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_definition(&id).await? {
                Some(info) => jobs.push(info),
                None => warn!(job_id = %id, "Job id order references a missing definition"),
            }
        }
        Ok(jobs)
    }

    pub async fn count(&self) -> AppResult<usize> {
        self.store
            .backend()
            .map_len(&self.store.keys().job_info())
            .await
            .map_err(|e| AppError::store("count jobs", e))
    }

    /// Every stored definition, in no particular order.
    pub async fn query_all_jobs(&self) -> AppResult<Vec<JobInfo>> {
        let values = self
            .store
            .backend()
            .map_values(&self.store.keys().job_info())
            .await
            .map_err(|e| AppError::store("read job definitions", e))?;

        values
            .iter()
            .map(|raw| decode(raw).map_err(|e| AppError::store("decode job definition", e)))
            .collect()
    }

    /// Append a revision, evicting the oldest ones beyond the history limit.
    ///
    /// The revision always receives a new id and the current time.
    pub async fn add_job_script(&self, mut script: JobScript) -> AppResult<JobScript> {
        let backend = self.store.backend();
        let key = self.store.keys().job_scripts(&script.job_id);

        script.id = Uuid::new_v4().to_string();
        script.time = Timestamp::now();

        let payload = encode(&script).map_err(|e| AppError::store("encode job script", e))?;
        let len = backend
            .list_push(&key, payload)
            .await
            .map_err(|e| AppError::store("append job script", e))?;

        if len > SCRIPT_HISTORY_LIMIT {
            backend
                .list_trim(&key, SCRIPT_HISTORY_LIMIT)
                .await
                .map_err(|e| AppError::store("evict job scripts", e))?;
        }

        Ok(script)
    }

    /// Full revision history of a job, oldest first.
    pub async fn query_job_scripts(&self, job_id: &str) -> AppResult<Vec<JobScript>> {
        let values = self
            .store
            .backend()
            .list_range(&self.store.keys().job_scripts(job_id), 0, usize::MAX)
            .await
            .map_err(|e| AppError::store("read job scripts", e))?;

        values
            .iter()
            .map(|raw| decode(raw).map_err(|e| AppError::store("decode job script", e)))
            .collect()
    }

    pub async fn remove_job_scripts(&self, job_id: &str) -> AppResult<()> {
        self.store
            .backend()
            .list_delete(&self.store.keys().job_scripts(job_id))
            .await
            .map_err(|e| AppError::store("remove job scripts", e))
    }

    pub(crate) async fn get_definition(&self, id: &str) -> AppResult<Option<JobInfo>> {
        let raw = self
            .store
            .backend()
            .map_get(&self.store.keys().job_info(), id)
            .await
            .map_err(|e| AppError::store("read job definition", e))?;

        raw.map(|raw| decode(&raw).map_err(|e| AppError::store("decode job definition", e)))
            .transpose()
    }

    async fn exists(&self, id: &str) -> AppResult<bool> {
        Ok(self.get_definition(id).await?.is_some())
    }

    async fn latest_script(&self, job_id: &str) -> AppResult<Option<JobScript>> {
        let backend = self.store.backend();
        let key = self.store.keys().job_scripts(job_id);

        let len = backend
            .list_len(&key)
            .await
            .map_err(|e| AppError::store("count job scripts", e))?;
        if len == 0 {
            return Ok(None);
        }

        let raw = backend
            .list_get(&key, len - 1)
            .await
            .map_err(|e| AppError::store("read job script", e))?;
        raw.map(|raw| decode(&raw).map_err(|e| AppError::store("decode job script", e)))
            .transpose()
    }

    async fn put_definition(&self, info: &JobInfo) -> AppResult<()> {
        let payload = encode(info).map_err(|e| AppError::store("encode job definition", e))?;
        self.store
            .backend()
            .map_put(&self.store.keys().job_info(), &info.id, payload)
            .await
            .map_err(|e| AppError::store("write job definition", e))
    }
}
