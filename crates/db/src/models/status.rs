//! Lifecycle status enums mapping to the Postgres enum types created in
//! the initial migration.
//!
//! Both state machines are monotonic at the terminal end: `Completed`,
//! `Failed` and `Ready` are never reverted. The repositories enforce
//! this with guarded UPDATEs; these enums only name the states.

use serde::{Deserialize, Serialize};

/// Aggregate status of a [`super::Comparison`].
///
/// `Comparing` is the single-writer fan-in flag: exactly one result
/// consumer wins the PENDING -> COMPARING transition and dispatches the
/// comparison job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "comparison_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ComparisonStatus {
    Pending,
    Comparing,
    Completed,
    Failed,
}

impl ComparisonStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ComparisonStatus::Completed | ComparisonStatus::Failed)
    }
}

/// Per-file status within a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "comparison_file_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl FileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Ready | FileStatus::Failed)
    }
}
