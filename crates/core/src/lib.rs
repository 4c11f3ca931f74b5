//! Pure domain logic for the point-cloud comparison pipeline.
//!
//! No I/O lives here: geometry value types, the region partitioner,
//! and the domain error type. Everything else (persistence, messaging,
//! orchestration) builds on top of this crate.

pub mod error;
pub mod geometry;
pub mod partition;
pub mod types;

pub use error::CoreError;
