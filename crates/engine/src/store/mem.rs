//! In-memory [`ComparisonStore`] for tests and single-process runs.
//!
//! One mutex serializes every mutation, which gives the same atomic
//! read-modify-write guarantee the Postgres store gets from guarded
//! UPDATEs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lascmp_core::types::DbId;
use lascmp_db::models::status::{ComparisonStatus, FileStatus};
use lascmp_db::models::{Comparison, ComparisonFile, NewComparisonFile};

use super::{ComparisonStore, StoreError};

#[derive(Default)]
struct Inner {
    next_id: DbId,
    comparisons: HashMap<DbId, Comparison>,
    files: HashMap<(DbId, DbId), ComparisonFile>,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComparisonStore for MemStore {
    async fn create_comparison(&self, name: &str) -> Result<Comparison, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let now = chrono::Utc::now();
        let comparison = Comparison {
            id: inner.next_id,
            name: name.to_string(),
            status: ComparisonStatus::Pending,
            error_message: None,
            result_bucket: None,
            result_object_key: None,
            created_at: now,
            updated_at: now,
        };
        inner.comparisons.insert(comparison.id, comparison.clone());
        Ok(comparison)
    }

    async fn get_comparison(&self, id: DbId) -> Result<Option<Comparison>, StoreError> {
        Ok(self.inner.lock().await.comparisons.get(&id).cloned())
    }

    async fn insert_file(&self, file: &NewComparisonFile) -> Result<ComparisonFile, StoreError> {
        let row = ComparisonFile {
            comparison_id: file.comparison_id,
            file_id: file.file_id,
            group_name: file.group_name.clone(),
            included: file.included,
            status: file.status,
            bucket: None,
            object_key: None,
            error_msg: None,
        };
        self.inner
            .lock()
            .await
            .files
            .insert((file.comparison_id, file.file_id), row.clone());
        Ok(row)
    }

    async fn get_file(
        &self,
        comparison_id: DbId,
        file_id: DbId,
    ) -> Result<Option<ComparisonFile>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .files
            .get(&(comparison_id, file_id))
            .cloned())
    }

    async fn list_files(&self, comparison_id: DbId) -> Result<Vec<ComparisonFile>, StoreError> {
        let inner = self.inner.lock().await;
        let mut files: Vec<ComparisonFile> = inner
            .files
            .values()
            .filter(|f| f.comparison_id == comparison_id)
            .cloned()
            .collect();
        files.sort_by_key(|f| f.file_id);
        Ok(files)
    }

    async fn list_included_files(
        &self,
        comparison_id: DbId,
    ) -> Result<Vec<ComparisonFile>, StoreError> {
        Ok(self
            .list_files(comparison_id)
            .await?
            .into_iter()
            .filter(|f| f.included)
            .collect())
    }

    async fn all_included_ready(&self, comparison_id: DbId) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .files
            .values()
            .filter(|f| f.comparison_id == comparison_id && f.included)
            .all(|f| f.status == FileStatus::Ready))
    }

    async fn try_begin_comparing(&self, comparison_id: DbId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.comparisons.get_mut(&comparison_id) {
            Some(c) if c.status == ComparisonStatus::Pending => {
                c.status = ComparisonStatus::Comparing;
                c.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_comparison_if_active(
        &self,
        comparison_id: DbId,
        error_message: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.comparisons.get_mut(&comparison_id) {
            Some(c) if !c.status.is_terminal() => {
                c.status = ComparisonStatus::Failed;
                c.error_message = Some(error_message.to_string());
                c.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_comparison(
        &self,
        comparison_id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.comparisons.get_mut(&comparison_id) {
            Some(c) if c.status == ComparisonStatus::Comparing => {
                c.status = ComparisonStatus::Completed;
                c.result_bucket = Some(bucket.to_string());
                c.result_object_key = Some(object_key.to_string());
                c.error_message = None;
                c.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_file_ready(
        &self,
        comparison_id: DbId,
        file_id: DbId,
        bucket: &str,
        object_key: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.files.get_mut(&(comparison_id, file_id)) {
            Some(f) if f.status == FileStatus::Processing => {
                f.status = FileStatus::Ready;
                f.bucket = Some(bucket.to_string());
                f.object_key = Some(object_key.to_string());
                f.error_msg = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_file_if_processing(
        &self,
        comparison_id: DbId,
        file_id: DbId,
        error_msg: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.files.get_mut(&(comparison_id, file_id)) {
            Some(f) if f.status == FileStatus::Processing => {
                f.status = FileStatus::Failed;
                f.error_msg = Some(error_msg.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
