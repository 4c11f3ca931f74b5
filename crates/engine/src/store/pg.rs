//! Postgres-backed [`ComparisonStore`] delegating to the `lascmp-db`
//! repositories. Transition atomicity comes from the repositories'
//! guarded UPDATE statements.

use async_trait::async_trait;

use lascmp_core::types::DbId;
use lascmp_db::models::{Comparison, ComparisonFile, NewComparisonFile};
use lascmp_db::repositories::{ComparisonFileRepo, ComparisonRepo};
use lascmp_db::DbPool;

use super::{ComparisonStore, StoreError};

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComparisonStore for PgStore {
    async fn create_comparison(&self, name: &str) -> Result<Comparison, StoreError> {
        Ok(ComparisonRepo::create(&self.pool, name).await?)
    }

    async fn get_comparison(&self, id: DbId) -> Result<Option<Comparison>, StoreError> {
        Ok(ComparisonRepo::find_by_id(&self.pool, id).await?)
    }

    async fn insert_file(&self, file: &NewComparisonFile) -> Result<ComparisonFile, StoreError> {
        Ok(ComparisonFileRepo::insert(&self.pool, file).await?)
    }

    async fn get_file(
        &self,
        comparison_id: DbId,
        file_id: DbId,
    ) -> Result<Option<ComparisonFile>, StoreError> {
        Ok(ComparisonFileRepo::find(&self.pool, comparison_id, file_id).await?)
    }

    async fn list_files(&self, comparison_id: DbId) -> Result<Vec<ComparisonFile>, StoreError> {
        Ok(ComparisonFileRepo::list_by_comparison(&self.pool, comparison_id).await?)
    }

    async fn list_included_files(
        &self,
        comparison_id: DbId,
    ) -> Result<Vec<ComparisonFile>, StoreError> {
        Ok(ComparisonFileRepo::list_included(&self.pool, comparison_id).await?)
    }

    async fn all_included_ready(&self, comparison_id: DbId) -> Result<bool, StoreError> {
        Ok(ComparisonFileRepo::all_included_ready(&self.pool, comparison_id).await?)
    }

    async fn try_begin_comparing(&self, comparison_id: DbId) -> Result<bool, StoreError> {
        Ok(ComparisonRepo::try_begin_comparing(&self.pool, comparison_id).await?)
    }

    async fn fail_comparison_if_active(
        &self,
        comparison_id: DbId,
        error_message: &str,
    ) -> Result<bool, StoreError> {
        Ok(ComparisonRepo::fail_if_active(&self.pool, comparison_id, error_message).await?)
    }

    async fn complete_comparison(
        &self,
        comparison_id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, StoreError> {
        Ok(ComparisonRepo::complete(&self.pool, comparison_id, bucket, object_key).await?)
    }

    async fn mark_file_ready(
        &self,
        comparison_id: DbId,
        file_id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, StoreError> {
        Ok(
            ComparisonFileRepo::mark_ready(&self.pool, comparison_id, file_id, bucket, object_key)
                .await?,
        )
    }

    async fn fail_file_if_processing(
        &self,
        comparison_id: DbId,
        file_id: DbId,
        error_msg: &str,
    ) -> Result<bool, StoreError> {
        Ok(
            ComparisonFileRepo::fail_if_processing(&self.pool, comparison_id, file_id, error_msg)
                .await?,
        )
    }
}
