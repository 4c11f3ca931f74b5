//! Persistence seam for the orchestration engine.
//!
//! The engine never talks SQL directly; it drives entity state through
//! [`ComparisonStore`]. Implementations must make each status
//! transition atomic (guarded update / compare-and-set semantics) so
//! that results, fan-in checks, and the timeout sweep can interleave
//! freely. [`PgStore`] delegates to the `lascmp-db` repositories;
//! [`mem::MemStore`] backs tests and single-process runs.

pub mod mem;
mod pg;

use async_trait::async_trait;

use lascmp_core::types::DbId;
use lascmp_db::models::{Comparison, ComparisonFile, NewComparisonFile};

pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Entity state owned by the external persistence collaborator.
///
/// Every mutation returns whether it applied; `false` means the entity
/// already moved on (terminal state, lost race) and the caller must
/// treat the call as a benign no-op.
#[async_trait]
pub trait ComparisonStore: Send + Sync {
    async fn create_comparison(&self, name: &str) -> Result<Comparison, StoreError>;

    async fn get_comparison(&self, id: DbId) -> Result<Option<Comparison>, StoreError>;

    async fn insert_file(&self, file: &NewComparisonFile) -> Result<ComparisonFile, StoreError>;

    async fn get_file(
        &self,
        comparison_id: DbId,
        file_id: DbId,
    ) -> Result<Option<ComparisonFile>, StoreError>;

    async fn list_files(&self, comparison_id: DbId) -> Result<Vec<ComparisonFile>, StoreError>;

    /// The comparison job's input set: included files only.
    async fn list_included_files(
        &self,
        comparison_id: DbId,
    ) -> Result<Vec<ComparisonFile>, StoreError>;

    /// Re-derive fan-in readiness from persisted state.
    async fn all_included_ready(&self, comparison_id: DbId) -> Result<bool, StoreError>;

    /// Compare-and-set PENDING -> COMPARING. Exactly one caller wins.
    async fn try_begin_comparing(&self, comparison_id: DbId) -> Result<bool, StoreError>;

    /// Mark the comparison FAILED unless already terminal.
    async fn fail_comparison_if_active(
        &self,
        comparison_id: DbId,
        error_message: &str,
    ) -> Result<bool, StoreError>;

    /// Mark a COMPARING comparison COMPLETED with its result location.
    async fn complete_comparison(
        &self,
        comparison_id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, StoreError>;

    /// Mark a PROCESSING file READY with its result location.
    async fn mark_file_ready(
        &self,
        comparison_id: DbId,
        file_id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, StoreError>;

    /// Mark a PROCESSING file FAILED with an error message.
    async fn fail_file_if_processing(
        &self,
        comparison_id: DbId,
        file_id: DbId,
        error_msg: &str,
    ) -> Result<bool, StoreError>;
}
