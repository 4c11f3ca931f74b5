//! Periodic timeout sweep over the job registry.
//!
//! A single long-lived Tokio task owned by the composition root. The
//! interval must stay below the shortest job timeout in use so that
//! worst-case detection latency is bounded by one interval.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cascade::TimeoutCascade;
use crate::registry::JobRegistry;

/// Default sweep interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Run the sweep loop until `cancel` is triggered.
///
/// Expired jobs are removed from the registry first and only then fed
/// to the cascade, so all blocking store work happens outside the
/// registry's critical section.
pub async fn run(
    registry: Arc<JobRegistry>,
    cascade: TimeoutCascade,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Timeout sweep started");
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Timeout sweep shutting down");
                break;
            }
            _ = ticker.tick() => {
                let expired = registry.sweep(chrono::Utc::now()).await;
                for job in &expired {
                    tracing::warn!(
                        job_id = %job.job_id,
                        job_type = ?job.job_type,
                        comparison_id = job.comparison_id,
                        "Job timed out and was removed",
                    );
                    if let Err(e) = cascade.on_expired(job).await {
                        tracing::error!(job_id = %job.job_id, error = %e, "Timeout cascade failed");
                    }
                }
            }
        }
    }
}
