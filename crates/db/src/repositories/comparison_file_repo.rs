//! Repository for the `comparison_files` table.
//!
//! Mirrors the guarded-transition discipline of
//! [`super::ComparisonRepo`]: `READY`/`FAILED` are terminal and the
//! WHERE clauses ensure a file resolved by a result can never be
//! re-failed by a later timeout, or vice versa.

use sqlx::PgPool;

use lascmp_core::types::DbId;

use crate::models::status::FileStatus;
use crate::models::{ComparisonFile, NewComparisonFile};

/// Column list for `comparison_files` queries.
const COLUMNS: &str = "\
    comparison_id, file_id, group_name, included, status, \
    bucket, object_key, error_msg";

/// Provides CRUD and guarded status transitions for per-file rows.
pub struct ComparisonFileRepo;

impl ComparisonFileRepo {
    /// Insert a per-file row.
    pub async fn insert(
        pool: &PgPool,
        input: &NewComparisonFile,
    ) -> Result<ComparisonFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO comparison_files \
                 (comparison_id, file_id, group_name, included, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ComparisonFile>(&query)
            .bind(input.comparison_id)
            .bind(input.file_id)
            .bind(&input.group_name)
            .bind(input.included)
            .bind(input.status)
            .fetch_one(pool)
            .await
    }

    /// Find one row by its composite key.
    pub async fn find(
        pool: &PgPool,
        comparison_id: DbId,
        file_id: DbId,
    ) -> Result<Option<ComparisonFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comparison_files \
             WHERE comparison_id = $1 AND file_id = $2"
        );
        sqlx::query_as::<_, ComparisonFile>(&query)
            .bind(comparison_id)
            .bind(file_id)
            .fetch_optional(pool)
            .await
    }

    /// List every file row of a comparison.
    pub async fn list_by_comparison(
        pool: &PgPool,
        comparison_id: DbId,
    ) -> Result<Vec<ComparisonFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comparison_files \
             WHERE comparison_id = $1 ORDER BY file_id"
        );
        sqlx::query_as::<_, ComparisonFile>(&query)
            .bind(comparison_id)
            .fetch_all(pool)
            .await
    }

    /// List the included files of a comparison (the comparison job's
    /// input set).
    pub async fn list_included(
        pool: &PgPool,
        comparison_id: DbId,
    ) -> Result<Vec<ComparisonFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comparison_files \
             WHERE comparison_id = $1 AND included ORDER BY file_id"
        );
        sqlx::query_as::<_, ComparisonFile>(&query)
            .bind(comparison_id)
            .fetch_all(pool)
            .await
    }

    /// True when every included file of the comparison reached `READY`.
    ///
    /// Re-derived from the table on every call; fan-in readiness is
    /// never cached.
    pub async fn all_included_ready(
        pool: &PgPool,
        comparison_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let pending: (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                 SELECT 1 FROM comparison_files \
                 WHERE comparison_id = $1 AND included AND status <> $2 \
             )",
        )
        .bind(comparison_id)
        .bind(FileStatus::Ready)
        .fetch_one(pool)
        .await?;
        Ok(!pending.0)
    }

    /// Mark a `PROCESSING` file `READY` with its preprocessing result
    /// location. Returns `false` if the file already left `PROCESSING`.
    pub async fn mark_ready(
        pool: &PgPool,
        comparison_id: DbId,
        file_id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comparison_files \
             SET status = $3, bucket = $4, object_key = $5, error_msg = NULL \
             WHERE comparison_id = $1 AND file_id = $2 AND status = $6",
        )
        .bind(comparison_id)
        .bind(file_id)
        .bind(FileStatus::Ready)
        .bind(bucket)
        .bind(object_key)
        .bind(FileStatus::Processing)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a `PROCESSING` file `FAILED` with an error message.
    /// Returns `false` if the file already reached a terminal state.
    pub async fn fail_if_processing(
        pool: &PgPool,
        comparison_id: DbId,
        file_id: DbId,
        error_msg: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comparison_files \
             SET status = $3, error_msg = $4 \
             WHERE comparison_id = $1 AND file_id = $2 AND status = $5",
        )
        .bind(comparison_id)
        .bind(file_id)
        .bind(FileStatus::Failed)
        .bind(error_msg)
        .bind(FileStatus::Processing)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
