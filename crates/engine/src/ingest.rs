//! Consumes worker result messages and drives entity state from them.
//!
//! The registry is the attribution gate: a result whose job id is not
//! outstanding (already completed, swept as expired, or never issued)
//! is logged and dropped without touching any entity. Past the gate,
//! every transition goes through the store's guarded updates, so stale
//! or duplicate deliveries degrade to logged no-ops.

use std::sync::Arc;

use serde_json::Value;

use lascmp_events::{
    decode_comparison_result, decode_preprocess_result, ComparisonResult, PreprocessResult,
    WorkerOutcome,
};

use crate::error::EngineResult;
use crate::orchestrator::JobOrchestrator;
use crate::registry::JobRegistry;
use crate::store::ComparisonStore;

/// Stored on the comparison when a worker reports a preprocessing failure.
const PREPROCESS_FAILED_MSG: &str = "One or more preprocessing files failed";

pub struct ResultIngester {
    store: Arc<dyn ComparisonStore>,
    registry: Arc<JobRegistry>,
    orchestrator: Arc<JobOrchestrator>,
}

impl ResultIngester {
    pub fn new(
        store: Arc<dyn ComparisonStore>,
        registry: Arc<JobRegistry>,
        orchestrator: Arc<JobOrchestrator>,
    ) -> Self {
        Self {
            store,
            registry,
            orchestrator,
        }
    }

    /// Handle one raw preprocessing result message.
    pub async fn on_preprocess_result(&self, message: &Value) -> EngineResult<()> {
        let result = match decode_preprocess_result(message) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed preprocessing result");
                return Ok(());
            }
        };

        if !self.registry.complete(result.job_id).await {
            // Unknown or already-swept job: do not touch the entities.
            return Ok(());
        }

        self.apply_preprocess_result(&result).await
    }

    /// Handle one raw comparison result message.
    pub async fn on_comparison_result(&self, message: &Value) -> EngineResult<()> {
        let result = match decode_comparison_result(message) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed comparison result");
                return Ok(());
            }
        };

        if !self.registry.complete(result.job_id).await {
            return Ok(());
        }

        self.apply_comparison_result(&result).await
    }

    async fn apply_preprocess_result(&self, result: &PreprocessResult) -> EngineResult<()> {
        let Some(file) = self
            .store
            .get_file(result.comparison_id, result.file_id)
            .await?
        else {
            tracing::warn!(
                job_id = %result.job_id,
                comparison_id = result.comparison_id,
                file_id = result.file_id,
                "Preprocessing result references an unknown file; dropping",
            );
            return Ok(());
        };

        if file.status.is_terminal() {
            tracing::info!(
                comparison_id = result.comparison_id,
                file_id = result.file_id,
                status = ?file.status,
                "Preprocessing result for an already-resolved file; ignoring",
            );
            return Ok(());
        }

        match &result.outcome {
            WorkerOutcome::Failure { reason } => {
                if self
                    .store
                    .fail_file_if_processing(result.comparison_id, result.file_id, reason)
                    .await?
                {
                    tracing::warn!(
                        comparison_id = result.comparison_id,
                        file_id = result.file_id,
                        reason = %reason,
                        "Preprocessing failed; file marked FAILED",
                    );
                }
                if self
                    .store
                    .fail_comparison_if_active(result.comparison_id, PREPROCESS_FAILED_MSG)
                    .await?
                {
                    tracing::warn!(
                        comparison_id = result.comparison_id,
                        "Comparison marked FAILED after preprocessing failure",
                    );
                }
                Ok(())
            }
            WorkerOutcome::Success(location) => {
                if !self
                    .store
                    .mark_file_ready(
                        result.comparison_id,
                        result.file_id,
                        &location.bucket,
                        &location.object_key,
                    )
                    .await?
                {
                    tracing::info!(
                        comparison_id = result.comparison_id,
                        file_id = result.file_id,
                        "File left PROCESSING before its result arrived; ignoring",
                    );
                    return Ok(());
                }
                tracing::info!(
                    comparison_id = result.comparison_id,
                    file_id = result.file_id,
                    "File preprocessed",
                );
                self.orchestrator.check_fan_in(result.comparison_id).await?;
                Ok(())
            }
        }
    }

    async fn apply_comparison_result(&self, result: &ComparisonResult) -> EngineResult<()> {
        let Some(comparison) = self.store.get_comparison(result.comparison_id).await? else {
            tracing::warn!(
                job_id = %result.job_id,
                comparison_id = result.comparison_id,
                "Comparison result references an unknown comparison; dropping",
            );
            return Ok(());
        };

        if comparison.status.is_terminal() {
            tracing::info!(
                comparison_id = result.comparison_id,
                status = ?comparison.status,
                "Comparison result for an already-resolved comparison; ignoring",
            );
            return Ok(());
        }

        match &result.outcome {
            WorkerOutcome::Failure { reason } => {
                if self
                    .store
                    .fail_comparison_if_active(result.comparison_id, reason)
                    .await?
                {
                    tracing::warn!(
                        comparison_id = result.comparison_id,
                        reason = %reason,
                        "Comparison marked FAILED",
                    );
                }
                Ok(())
            }
            WorkerOutcome::Success(location) => {
                if self
                    .store
                    .complete_comparison(
                        result.comparison_id,
                        &location.bucket,
                        &location.object_key,
                    )
                    .await?
                {
                    tracing::info!(comparison_id = result.comparison_id, "Comparison completed");
                } else {
                    tracing::info!(
                        comparison_id = result.comparison_id,
                        "Comparison was not in COMPARING; success result ignored",
                    );
                }
                Ok(())
            }
        }
    }
}
