//! Transport-agnostic message contracts for the worker fleet.
//!
//! Outbound job-start DTOs, the single validating decode step for
//! inbound worker results, and the [`WorkerQueue`] seam with an
//! in-process implementation for tests and local runs. The actual
//! broker wiring lives outside this workspace.

pub mod messages;
pub mod queue;

pub use messages::{
    decode_comparison_result, decode_preprocess_result, ComparisonInputFile, ComparisonResult,
    DecodeError, PreprocessResult, StartComparisonJob, StartPreprocessJob, StorageRef,
    WorkerOutcome,
};
pub use queue::{InProcessQueue, JobStreams, QueueError, WorkerQueue};
