//! In-memory registry of outstanding worker jobs.
//!
//! Every dispatched job is registered here with a deadline. Results
//! complete jobs; the sweep removes expired ones. Both paths remove
//! under the same write lock, so a job can be resolved exactly once:
//! a result racing the sweep either completes the job (and the sweep
//! never sees it) or finds it gone (and is dropped as a late arrival).

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use lascmp_core::types::{DbId, Timestamp};

/// The two job stages tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    Preprocessing,
    Comparison,
}

/// One outstanding worker job and the entity it belongs to.
#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub comparison_id: DbId,
    /// Set for preprocessing jobs; comparison jobs have no single file.
    pub file_id: Option<DbId>,
    pub created_at: Timestamp,
    pub timeout: Duration,
}

impl TrackedJob {
    /// Track a preprocessing job for one file of a comparison.
    pub fn preprocessing(
        job_id: Uuid,
        comparison_id: DbId,
        file_id: DbId,
        timeout: Duration,
    ) -> Self {
        Self {
            job_id,
            job_type: JobType::Preprocessing,
            comparison_id,
            file_id: Some(file_id),
            created_at: chrono::Utc::now(),
            timeout,
        }
    }

    /// Track the final comparison job of a comparison.
    pub fn comparison(job_id: Uuid, comparison_id: DbId, timeout: Duration) -> Self {
        Self {
            job_id,
            job_type: JobType::Comparison,
            comparison_id,
            file_id: None,
            created_at: chrono::Utc::now(),
            timeout,
        }
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match chrono::Duration::from_std(self.timeout) {
            Ok(timeout) => self.created_at + timeout < now,
            // A timeout too large for chrono never expires.
            Err(_) => false,
        }
    }
}

/// Concurrent job store shared by dispatchers, result consumers, and
/// the sweep loop. Designed to be wrapped in `Arc`.
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, TrackedJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a newly dispatched job.
    pub async fn register(&self, job: TrackedJob) {
        tracing::info!(
            job_id = %job.job_id,
            job_type = ?job.job_type,
            comparison_id = job.comparison_id,
            timeout_secs = job.timeout.as_secs(),
            "Registered job",
        );
        self.jobs.write().await.insert(job.job_id, job);
    }

    /// Complete a job, removing it from timeout consideration.
    ///
    /// Returns `false` when the job is unknown (already completed or
    /// already swept). Callers use this as the attribution gate for
    /// inbound results.
    pub async fn complete(&self, job_id: Uuid) -> bool {
        match self.jobs.write().await.remove(&job_id) {
            Some(job) => {
                tracing::info!(job_id = %job_id, job_type = ?job.job_type, "Job completed and removed");
                true
            }
            None => {
                tracing::warn!(job_id = %job_id, "Attempted to complete unknown job");
                false
            }
        }
    }

    /// Look up an outstanding job.
    pub async fn get(&self, job_id: Uuid) -> Option<TrackedJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Number of jobs currently outstanding.
    pub async fn outstanding(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Remove and return every job whose deadline passed before `now`.
    ///
    /// Removal happens under the write lock, so a job returned here was
    /// definitively not completed, and a job completed concurrently is
    /// never returned.
    pub async fn sweep(&self, now: Timestamp) -> Vec<TrackedJob> {
        let mut jobs = self.jobs.write().await;
        let expired_ids: Vec<Uuid> = jobs
            .values()
            .filter(|job| job.is_expired(now))
            .map(|job| job.job_id)
            .collect();

        expired_ids
            .into_iter()
            .filter_map(|id| jobs.remove(&id))
            .collect()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
