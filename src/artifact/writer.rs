//! File-backed chunk artifacts.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::{ArtifactKey, ArtifactStore, ChunkWriter};
use crate::{AppError, Result};

/// Stores chunk artifacts as files inside one directory.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    /// Construct a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory artifacts are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the artifact for `key`.
    #[must_use]
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl ArtifactStore for FileArtifactStore {
    fn open<'a>(
        &'a self,
        key: &'a ArtifactKey,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ChunkWriter>>> + Send + 'a>> {
        Box::pin(async move {
            fs::create_dir_all(&self.dir).await.map_err(|e| {
                AppError::Io(format!(
                    "failed to create artifact directory {}: {e}",
                    self.dir.display()
                ))
            })?;

            let path = self.path_for(key);
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .await
                .map_err(|e| {
                    AppError::Io(format!("failed to open artifact {}: {e}", path.display()))
                })?;
            debug!(path = %path.display(), "artifact opened");

            let writer: Box<dyn ChunkWriter> = Box::new(FileChunkWriter {
                path,
                writer: BufWriter::new(file),
            });
            Ok(writer)
        })
    }

    fn locate(&self, key: &ArtifactKey) -> String {
        self.path_for(key).display().to_string()
    }
}

/// Buffered writer for one chunk file.
struct FileChunkWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ChunkWriter for FileChunkWriter {
    fn write<'a>(
        &'a mut self,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.writer.write_all(data).await.map_err(|e| {
                AppError::Io(format!("write to {} failed: {e}", self.path.display()))
            })
        })
    }

    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move {
            let Self { path, mut writer } = *self;
            writer
                .flush()
                .await
                .map_err(|e| AppError::Io(format!("flush of {} failed: {e}", path.display())))?;
            writer
                .into_inner()
                .sync_all()
                .await
                .map_err(|e| AppError::Io(format!("sync of {} failed: {e}", path.display())))?;
            debug!(path = %path.display(), "artifact closed");
            Ok(())
        })
    }
}
