//! Repository for the `comparisons` table.
//!
//! Status transitions are guarded in SQL so terminal states are never
//! reverted, no matter how results and timeouts interleave. The fan-in
//! race is decided here: [`ComparisonRepo::try_begin_comparing`] is a
//! compare-and-set on the `PENDING` status and exactly one caller wins.

use sqlx::PgPool;

use lascmp_core::types::DbId;

use crate::models::status::ComparisonStatus;
use crate::models::Comparison;

/// Column list for `comparisons` queries.
const COLUMNS: &str = "\
    id, name, status, error_message, result_bucket, result_object_key, \
    created_at, updated_at";

/// Provides CRUD and guarded status transitions for comparisons.
pub struct ComparisonRepo;

impl ComparisonRepo {
    /// Create a new comparison in `PENDING` status.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Comparison, sqlx::Error> {
        let query = format!("INSERT INTO comparisons (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Comparison>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Find a comparison by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Comparison>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comparisons WHERE id = $1");
        sqlx::query_as::<_, Comparison>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the most recently created comparisons.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Comparison>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comparisons ORDER BY created_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, Comparison>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Atomically move a `PENDING` comparison to `COMPARING`.
    ///
    /// Returns `true` for exactly one caller; concurrent fan-in checks
    /// for the same comparison observe `false` and must not dispatch.
    pub async fn try_begin_comparing(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comparisons \
             SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(ComparisonStatus::Comparing)
        .bind(ComparisonStatus::Pending)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a comparison `FAILED` with an error message, unless it is
    /// already terminal.
    ///
    /// Returns `false` when the comparison was already completed or
    /// failed; the first failure reason always wins.
    pub async fn fail_if_active(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comparisons \
             SET status = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(id)
        .bind(ComparisonStatus::Failed)
        .bind(error_message)
        .bind(ComparisonStatus::Completed)
        .bind(ComparisonStatus::Failed)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a `COMPARING` comparison `COMPLETED` with its result
    /// location.
    ///
    /// Only the `COMPARING` state can complete; a comparison failed by
    /// a timeout cascade ignores a late successful result.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comparisons \
             SET status = $2, result_bucket = $3, result_object_key = $4, \
                 error_message = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(id)
        .bind(ComparisonStatus::Completed)
        .bind(bucket)
        .bind(object_key)
        .bind(ComparisonStatus::Comparing)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a comparison; `comparison_files` rows cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comparisons WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
