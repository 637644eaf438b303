//! Checkpoint repository for `SQLite` persistence.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::db::Database;
use super::CheckpointStore;
use crate::{AppError, Result};

/// A stored checkpoint row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    /// Resource slug (primary key).
    pub resource_slug: String,
    /// Number of completed sub-tasks.
    pub sub_task_index: u64,
    /// Time of the last write.
    pub updated_at: DateTime<Utc>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct CheckpointRow {
    resource_slug: String,
    sub_task_index: i64,
    updated_at: String,
}

impl CheckpointRow {
    fn into_record(self) -> Result<CheckpointRecord> {
        let sub_task_index = u64::try_from(self.sub_task_index)
            .map_err(|_| AppError::Db(format!("negative checkpoint: {}", self.sub_task_index)))?;
        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| AppError::Db(format!("invalid updated_at: {e}")))?
            .with_timezone(&Utc);
        Ok(CheckpointRecord {
            resource_slug: self.resource_slug,
            sub_task_index,
            updated_at,
        })
    }
}

/// Repository wrapper around `SQLite` for checkpoint records.
#[derive(Clone)]
pub struct CheckpointRepo {
    db: Arc<Database>,
}

impl CheckpointRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Fetch the full record for a resource.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_record(&self, resource_slug: &str) -> Result<Option<CheckpointRecord>> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            "SELECT resource_slug, sub_task_index, updated_at
             FROM checkpoint
             WHERE resource_slug = ?1",
        )
        .bind(resource_slug)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(CheckpointRow::into_record).transpose()
    }

    /// Insert or replace the checkpoint for a resource.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn upsert(&self, resource_slug: &str, sub_task_index: u64) -> Result<()> {
        let index = i64::try_from(sub_task_index)
            .map_err(|_| AppError::Db(format!("checkpoint out of range: {sub_task_index}")))?;
        sqlx::query(
            "INSERT INTO checkpoint (resource_slug, sub_task_index, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(resource_slug) DO UPDATE SET
                sub_task_index = excluded.sub_task_index,
                updated_at = excluded.updated_at",
        )
        .bind(resource_slug)
        .bind(index)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Delete the checkpoint for a resource.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn remove(&self, resource_slug: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoint WHERE resource_slug = ?1")
            .bind(resource_slug)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// List every stored checkpoint ordered by slug.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self) -> Result<Vec<CheckpointRecord>> {
        let rows: Vec<CheckpointRow> = sqlx::query_as(
            "SELECT resource_slug, sub_task_index, updated_at
             FROM checkpoint
             ORDER BY resource_slug ASC",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(CheckpointRow::into_record).collect()
    }
}

impl CheckpointStore for CheckpointRepo {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<u64>>> + Send + 'a>> {
        Box::pin(async move {
            self.get_record(key)
                .await
                .map(|record| record.map(|r| r.sub_task_index))
                .map_err(|err| AppError::CheckpointUnavailable(err.to_string()))
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.upsert(key, value)
                .await
                .map_err(|err| AppError::Checkpoint(err.to_string()))
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.remove(key)
                .await
                .map_err(|err| AppError::Checkpoint(err.to_string()))
        })
    }
}
