//! Orchestration engine for multi-stage point-cloud comparisons.
//!
//! Fan-out: one preprocessing job per file per unclaimed region set.
//! Fan-in: the comparison job fires once every included file is READY.
//! The [`registry::JobRegistry`] tracks every outstanding job with a
//! deadline; the sweep loop fails expired jobs through the
//! [`cascade::TimeoutCascade`], and the [`ingest::ResultIngester`]
//! drives entity state from asynchronous worker results.

pub mod cascade;
pub mod error;
pub mod ingest;
pub mod orchestrator;
pub mod registry;
pub mod store;
pub mod sweep;

pub use cascade::TimeoutCascade;
pub use error::EngineError;
pub use ingest::ResultIngester;
pub use orchestrator::{ComparisonRequest, FileGroup, FileSpec, JobOrchestrator};
pub use registry::{JobRegistry, JobType, TrackedJob};
pub use store::{ComparisonStore, PgStore, StoreError};
