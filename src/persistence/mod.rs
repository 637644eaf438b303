//! Persistence layer modules.
//!
//! The orchestrator reads and writes checkpoints through the
//! [`CheckpointStore`] capability; [`checkpoint_repo::CheckpointRepo`]
//! (`SQLite`) and [`marker_client::MarkerClient`] (HTTP) implement it.

pub mod checkpoint_repo;
pub mod db;
pub mod marker_client;
pub mod schema;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::config::{CheckpointBackend, GlobalConfig};
use crate::{AppError, Result};

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

/// Durable key → integer store holding one checkpoint per resource slug.
///
/// An absent key is equivalent to checkpoint `0`.
pub trait CheckpointStore: Send + Sync {
    /// Read the checkpoint stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CheckpointUnavailable`](crate::AppError::CheckpointUnavailable)
    /// if the store cannot be reached.
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<u64>>> + Send + 'a>>;

    /// Store `value` for `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Checkpoint`](crate::AppError::Checkpoint) if the write fails.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Remove the checkpoint for `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Checkpoint`](crate::AppError::Checkpoint) if the delete fails.
    fn delete<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Open the checkpoint store selected by `config.checkpoint.backend`.
///
/// # Errors
///
/// Returns `AppError::Config` if the `sqlite` backend has no `db_path`,
/// `AppError::Db` if the database cannot be opened, or `AppError::Http` if
/// the HTTP client cannot be built.
pub async fn open_store(config: &GlobalConfig) -> Result<Arc<dyn CheckpointStore>> {
    match config.checkpoint.backend {
        CheckpointBackend::Http => {
            let client = marker_client::MarkerClient::new(&config.server, config.http_timeout())?
                .with_catalog(&config.resources);
            info!(base_url = config.server.base_url, "using http checkpoint store");
            Ok(Arc::new(client))
        }
        CheckpointBackend::Sqlite => Ok(Arc::new(open_repo(config).await?)),
    }
}

/// Open the local `SQLite` checkpoint repository at `config.checkpoint.db_path`.
///
/// # Errors
///
/// Returns `AppError::Config` if no `db_path` is configured, or
/// `AppError::Db` if the database cannot be opened.
pub async fn open_repo(config: &GlobalConfig) -> Result<checkpoint_repo::CheckpointRepo> {
    let path = config.checkpoint.db_path.as_deref().ok_or_else(|| {
        AppError::Config("checkpoint.db_path is required for the sqlite backend".into())
    })?;
    let pool = db::connect(path).await?;
    info!(path = %path.display(), "using sqlite checkpoint store");
    Ok(checkpoint_repo::CheckpointRepo::new(Arc::new(pool)))
}
