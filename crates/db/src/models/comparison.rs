//! Entity models for comparisons and their per-file rows.

use serde::Serialize;
use sqlx::FromRow;

use lascmp_core::types::{DbId, Timestamp};

use super::status::{ComparisonStatus, FileStatus};

/// A row from the `comparisons` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comparison {
    pub id: DbId,
    pub name: String,
    pub status: ComparisonStatus,
    pub error_message: Option<String>,
    pub result_bucket: Option<String>,
    pub result_object_key: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `comparison_files` table, keyed by
/// `(comparison_id, file_id)`.
///
/// `included = false` marks a file whose footprint was entirely claimed
/// by earlier files; it needs no preprocessing and is excluded from the
/// comparison job's input list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ComparisonFile {
    pub comparison_id: DbId,
    pub file_id: DbId,
    pub group_name: String,
    pub included: bool,
    pub status: FileStatus,
    pub bucket: Option<String>,
    pub object_key: Option<String>,
    pub error_msg: Option<String>,
}

/// Insert payload for a `comparison_files` row.
#[derive(Debug, Clone)]
pub struct NewComparisonFile {
    pub comparison_id: DbId,
    pub file_id: DbId,
    pub group_name: String,
    pub included: bool,
    pub status: FileStatus,
}
