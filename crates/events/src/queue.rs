//! The dispatch seam between the orchestrator and the job transport.
//!
//! Production deployments bind [`WorkerQueue`] to a broker adapter;
//! tests and single-process runs use [`InProcessQueue`], which hands
//! the job messages to in-process consumers over unbounded channels.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::messages::{StartComparisonJob, StartPreprocessJob};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Job queue unavailable: {0}")]
    Unavailable(String),
}

/// Publishes job-start messages to the worker fleet.
#[async_trait]
pub trait WorkerQueue: Send + Sync {
    async fn start_preprocess_job(&self, job: StartPreprocessJob) -> Result<(), QueueError>;
    async fn start_comparison_job(&self, job: StartComparisonJob) -> Result<(), QueueError>;
}

/// Receiver halves for an [`InProcessQueue`].
pub struct JobStreams {
    pub preprocess: mpsc::UnboundedReceiver<StartPreprocessJob>,
    pub comparison: mpsc::UnboundedReceiver<StartComparisonJob>,
}

/// Channel-backed queue for tests and single-process deployments.
pub struct InProcessQueue {
    preprocess_tx: mpsc::UnboundedSender<StartPreprocessJob>,
    comparison_tx: mpsc::UnboundedSender<StartComparisonJob>,
}

impl InProcessQueue {
    /// Create the queue and the matching receiver halves.
    pub fn new() -> (Self, JobStreams) {
        let (preprocess_tx, preprocess) = mpsc::unbounded_channel();
        let (comparison_tx, comparison) = mpsc::unbounded_channel();
        (
            Self {
                preprocess_tx,
                comparison_tx,
            },
            JobStreams {
                preprocess,
                comparison,
            },
        )
    }
}

#[async_trait]
impl WorkerQueue for InProcessQueue {
    async fn start_preprocess_job(&self, job: StartPreprocessJob) -> Result<(), QueueError> {
        self.preprocess_tx
            .send(job)
            .map_err(|e| QueueError::Unavailable(e.to_string()))
    }

    async fn start_comparison_job(&self, job: StartComparisonJob) -> Result<(), QueueError> {
        self.comparison_tx
            .send(job)
            .map_err(|e| QueueError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::StorageRef;
    use uuid::Uuid;

    #[tokio::test]
    async fn published_jobs_reach_the_stream() {
        let (queue, mut streams) = InProcessQueue::new();

        queue
            .start_comparison_job(StartComparisonJob {
                job_id: Uuid::nil(),
                comparison_id: 5,
                files: vec![],
            })
            .await
            .unwrap();

        let job = streams.comparison.recv().await.unwrap();
        assert_eq!(job.comparison_id, 5);
    }

    #[tokio::test]
    async fn dropped_receiver_surfaces_as_unavailable() {
        let (queue, streams) = InProcessQueue::new();
        drop(streams);

        let err = queue
            .start_preprocess_job(StartPreprocessJob {
                job_id: Uuid::nil(),
                comparison_id: 1,
                file_id: 1,
                file: StorageRef {
                    bucket: "basebucket".to_string(),
                    object_key: "scan.laz".to_string(),
                },
                regions: vec![],
                grid: lascmp_core::geometry::GridSpec {
                    cell_width: 1.0,
                    cell_height: 1.0,
                    origin_x: 0.0,
                    origin_y: 0.0,
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Unavailable(_)));
    }
}
