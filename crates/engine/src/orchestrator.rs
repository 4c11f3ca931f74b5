//! Fan-out and fan-in for a comparison run.
//!
//! `start_comparison` turns one client request into N preprocessing
//! jobs (one per file with unclaimed regions); `check_fan_in` fires the
//! single comparison job once every included file is READY. The fan-in
//! transition is a compare-and-set in the store, so two results racing
//! for the last files can never dispatch twice.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use lascmp_core::geometry::{BoundingBox, GridSpec};
use lascmp_core::partition::partition;
use lascmp_core::types::DbId;
use lascmp_core::CoreError;
use lascmp_db::models::status::FileStatus;
use lascmp_db::models::{Comparison, NewComparisonFile};
use lascmp_events::{
    ComparisonInputFile, StartComparisonJob, StartPreprocessJob, StorageRef, WorkerQueue,
};

use crate::error::EngineResult;
use crate::registry::{JobRegistry, TrackedJob};
use crate::store::ComparisonStore;

/// Default deadline for a single preprocessing job.
pub const DEFAULT_PREPROCESS_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default deadline for the final comparison job.
pub const DEFAULT_COMPARISON_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// One input file: identity, storage location, 2D footprint.
#[derive(Debug, Clone)]
pub struct FileSpec {
    pub file_id: DbId,
    pub location: StorageRef,
    pub bounds: BoundingBox,
}

/// An ordered group of files partitioned together.
///
/// Claim state never crosses group boundaries: two groups with
/// identical footprints are both preprocessed in full.
#[derive(Debug, Clone)]
pub struct FileGroup {
    pub group_name: String,
    pub files: Vec<FileSpec>,
}

/// A client request to compare a set of file groups over a grid.
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub name: String,
    pub grid: GridSpec,
    pub groups: Vec<FileGroup>,
}

impl ComparisonRequest {
    fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }
}

/// Drives job dispatch for comparisons.
pub struct JobOrchestrator {
    store: Arc<dyn ComparisonStore>,
    queue: Arc<dyn WorkerQueue>,
    registry: Arc<JobRegistry>,
    preprocess_timeout: Duration,
    comparison_timeout: Duration,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn ComparisonStore>,
        queue: Arc<dyn WorkerQueue>,
        registry: Arc<JobRegistry>,
        preprocess_timeout: Duration,
        comparison_timeout: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            registry,
            preprocess_timeout,
            comparison_timeout,
        }
    }

    /// Persist a new comparison and fan out its preprocessing jobs.
    ///
    /// Each group is partitioned independently; files whose snapped
    /// footprint is entirely claimed by earlier files in their group
    /// are stored READY and not-included; they need no work and no
    /// job is dispatched for them.
    pub async fn start_comparison(&self, request: &ComparisonRequest) -> EngineResult<Comparison> {
        request.grid.validate()?;
        if request.file_count() == 0 {
            return Err(CoreError::Validation(
                "A comparison requires at least one file".to_string(),
            )
            .into());
        }

        let comparison = self.store.create_comparison(&request.name).await?;
        tracing::info!(
            comparison_id = comparison.id,
            groups = request.groups.len(),
            files = request.file_count(),
            "Comparison created",
        );

        for group in &request.groups {
            let footprints: Vec<(DbId, BoundingBox)> = group
                .files
                .iter()
                .map(|f| (f.file_id, f.bounds))
                .collect();
            let region_sets = partition(&footprints, &request.grid);

            for (spec, region_set) in group.files.iter().zip(region_sets) {
                if region_set.is_empty() {
                    // Entirely covered by earlier files: nothing to do.
                    self.store
                        .insert_file(&NewComparisonFile {
                            comparison_id: comparison.id,
                            file_id: spec.file_id,
                            group_name: group.group_name.clone(),
                            included: false,
                            status: FileStatus::Ready,
                        })
                        .await?;
                    tracing::info!(
                        comparison_id = comparison.id,
                        file_id = spec.file_id,
                        "File footprint fully claimed; no preprocessing dispatched",
                    );
                    continue;
                }

                self.store
                    .insert_file(&NewComparisonFile {
                        comparison_id: comparison.id,
                        file_id: spec.file_id,
                        group_name: group.group_name.clone(),
                        included: true,
                        status: FileStatus::Processing,
                    })
                    .await?;

                let job_id = Uuid::new_v4();
                self.registry
                    .register(TrackedJob::preprocessing(
                        job_id,
                        comparison.id,
                        spec.file_id,
                        self.preprocess_timeout,
                    ))
                    .await;

                self.queue
                    .start_preprocess_job(StartPreprocessJob {
                        job_id,
                        comparison_id: comparison.id,
                        file_id: spec.file_id,
                        file: spec.location.clone(),
                        regions: region_set.regions,
                        grid: request.grid,
                    })
                    .await?;
                tracing::info!(
                    job_id = %job_id,
                    comparison_id = comparison.id,
                    file_id = spec.file_id,
                    "Preprocessing job dispatched",
                );
            }
        }

        Ok(comparison)
    }

    /// Dispatch the comparison job if every included file is READY.
    ///
    /// Called after every successful preprocessing result. Readiness is
    /// re-derived from the store on each call; the PENDING -> COMPARING
    /// compare-and-set makes the dispatch single-fire under arbitrary
    /// interleavings. Returns `true` when this call dispatched the job.
    pub async fn check_fan_in(&self, comparison_id: DbId) -> EngineResult<bool> {
        let Some(comparison) = self.store.get_comparison(comparison_id).await? else {
            tracing::error!(comparison_id, "Fan-in check for unknown comparison");
            return Ok(false);
        };

        if comparison.status.is_terminal() {
            tracing::info!(
                comparison_id,
                status = ?comparison.status,
                "Comparison already terminal; comparison job will not be started",
            );
            return Ok(false);
        }

        if !self.store.all_included_ready(comparison_id).await? {
            tracing::debug!(comparison_id, "Comparison not ready yet; waiting for other files");
            return Ok(false);
        }

        if !self.store.try_begin_comparing(comparison_id).await? {
            // Another result consumer won the transition.
            tracing::debug!(comparison_id, "Comparison job already started elsewhere");
            return Ok(false);
        }

        let included = self.store.list_included_files(comparison_id).await?;
        let mut files = Vec::with_capacity(included.len());
        for file in &included {
            match (&file.bucket, &file.object_key) {
                (Some(bucket), Some(object_key)) => files.push(ComparisonInputFile {
                    bucket: bucket.clone(),
                    object_key: object_key.clone(),
                    group_name: file.group_name.clone(),
                }),
                _ => {
                    // READY without a location is a store inconsistency.
                    tracing::error!(
                        comparison_id,
                        file_id = file.file_id,
                        "Included READY file has no result location",
                    );
                    self.store
                        .fail_comparison_if_active(
                            comparison_id,
                            "Preprocessed file is missing its result location",
                        )
                        .await?;
                    return Ok(false);
                }
            }
        }

        let job_id = Uuid::new_v4();
        self.registry
            .register(TrackedJob::comparison(
                job_id,
                comparison_id,
                self.comparison_timeout,
            ))
            .await;

        self.queue
            .start_comparison_job(StartComparisonJob {
                job_id,
                comparison_id,
                files,
            })
            .await?;
        tracing::info!(
            job_id = %job_id,
            comparison_id,
            files = included.len(),
            "All files preprocessed; comparison job dispatched",
        );
        Ok(true)
    }
}
