//! Chunk output artifacts.
//!
//! Each chunk is written to one artifact addressed by
//! `(resource slug, chunk start index, extension)`. The [`ArtifactStore`]
//! trait opens a [`ChunkWriter`] for that key; [`FileArtifactStore`] stores
//! artifacts as `<dir>/<slug>_<start>.<ext>`.

pub mod writer;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::Result;

pub use writer::FileArtifactStore;

/// Deterministic address of a chunk artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    /// Resource slug.
    pub resource_slug: String,
    /// Checkpoint value at the start of the chunk.
    pub chunk_start: usize,
    /// File extension without the leading dot.
    pub extension: String,
}

impl ArtifactKey {
    /// Construct a key.
    #[must_use]
    pub fn new(resource_slug: &str, chunk_start: usize, extension: &str) -> Self {
        Self {
            resource_slug: resource_slug.to_owned(),
            chunk_start,
            extension: extension.to_owned(),
        }
    }

    /// `<slug>_<start>.<ext>`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.{}",
            self.resource_slug, self.chunk_start, self.extension
        )
    }
}

/// Append-only byte sink for one chunk.
pub trait ChunkWriter: Send {
    /// Append `data` to the artifact.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`](crate::AppError::Io) if the write fails.
    fn write<'a>(
        &'a mut self,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Flush buffered bytes to durable storage and release the handle.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`](crate::AppError::Io) if flushing or syncing fails.
    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Factory for chunk writers.
pub trait ArtifactStore: Send + Sync {
    /// Open a fresh writer for `key`, replacing any partial artifact at that key.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`](crate::AppError::Io) if the artifact cannot be created.
    fn open<'a>(
        &'a self,
        key: &'a ArtifactKey,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ChunkWriter>>> + Send + 'a>>;

    /// Human-readable location of the artifact for `key`.
    fn locate(&self, key: &ArtifactKey) -> String;
}

/// A chunk artifact found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFile {
    /// Chunk start index parsed from the file name.
    pub chunk_start: usize,
    /// Full path of the file.
    pub path: PathBuf,
}

/// Parse the chunk start index out of `<slug>_<start>.<ext>`.
#[must_use]
pub fn parse_chunk_file_name(file_name: &str, slug: &str, extension: &str) -> Option<usize> {
    file_name
        .strip_prefix(slug)?
        .strip_prefix('_')?
        .strip_suffix(extension)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// List the chunk artifacts of `slug` in `dir`, ordered by chunk start.
///
/// This is the order in which the chunks must be concatenated.
///
/// # Errors
///
/// Returns `AppError::Io` if the directory cannot be read.
pub fn list_chunks(dir: &Path, slug: &str, extension: &str) -> Result<Vec<ChunkFile>> {
    let mut chunks: Vec<ChunkFile> = std::fs::read_dir(dir)?
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let name = entry.file_name();
            let chunk_start = parse_chunk_file_name(&name.to_string_lossy(), slug, extension)?;
            Some(ChunkFile {
                chunk_start,
                path: entry.path(),
            })
        })
        .collect();
    chunks.sort_by_key(|chunk| chunk.chunk_start);
    Ok(chunks)
}
