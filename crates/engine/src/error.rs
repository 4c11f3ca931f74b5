use lascmp_core::CoreError;
use lascmp_events::QueueError;

use crate::store::StoreError;

/// Error type for orchestration operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error (validation, not-found).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence error from the comparison store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The job queue refused a dispatch.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
