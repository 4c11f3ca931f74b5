//! Failure propagation for expired jobs.
//!
//! Invoked by the sweep loop with jobs that never received a result.
//! Every transition is idempotent: an entity that already reached a
//! terminal state is left untouched and the no-op is not an error.

use std::sync::Arc;

use crate::registry::{JobType, TrackedJob};
use crate::store::{ComparisonStore, StoreError};

/// Timeout message stored on a file that never reported back.
const FILE_TIMEOUT_MSG: &str = "Preprocessing timed out";

/// Timeout message stored on the comparison when a file timed out.
const CASCADE_MSG: &str = "One or more preprocessing files timed out";

/// Timeout message stored on a comparison whose final job expired.
const COMPARISON_TIMEOUT_MSG: &str = "Comparison job timed out";

/// Maps an expired job back to its owning entity and fails it.
pub struct TimeoutCascade {
    store: Arc<dyn ComparisonStore>,
}

impl TimeoutCascade {
    pub fn new(store: Arc<dyn ComparisonStore>) -> Self {
        Self { store }
    }

    /// Fail the entity behind an expired job, cascading file failures
    /// up to the comparison.
    pub async fn on_expired(&self, job: &TrackedJob) -> Result<(), StoreError> {
        match job.job_type {
            JobType::Preprocessing => self.expire_preprocessing(job).await,
            JobType::Comparison => self.expire_comparison(job).await,
        }
    }

    async fn expire_preprocessing(&self, job: &TrackedJob) -> Result<(), StoreError> {
        let Some(file_id) = job.file_id else {
            tracing::error!(job_id = %job.job_id, "Expired preprocessing job has no file id");
            return Ok(());
        };

        let failed = self
            .store
            .fail_file_if_processing(job.comparison_id, file_id, FILE_TIMEOUT_MSG)
            .await?;
        if !failed {
            // Already resolved by a result that won the race.
            tracing::debug!(
                comparison_id = job.comparison_id,
                file_id,
                "Expired job's file already left PROCESSING; nothing to do",
            );
            return Ok(());
        }

        tracing::warn!(
            comparison_id = job.comparison_id,
            file_id,
            "Preprocessing job expired; file marked FAILED",
        );

        if self
            .store
            .fail_comparison_if_active(job.comparison_id, CASCADE_MSG)
            .await?
        {
            tracing::warn!(
                comparison_id = job.comparison_id,
                "Comparison marked FAILED after preprocessing timeout",
            );
        }
        Ok(())
    }

    async fn expire_comparison(&self, job: &TrackedJob) -> Result<(), StoreError> {
        if self
            .store
            .fail_comparison_if_active(job.comparison_id, COMPARISON_TIMEOUT_MSG)
            .await?
        {
            tracing::warn!(
                comparison_id = job.comparison_id,
                "Comparison job expired; comparison marked FAILED",
            );
        }
        Ok(())
    }
}
