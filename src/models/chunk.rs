//! Chunk partitioning of the remaining sub-tasks.

use std::ops::Range;

use serde::Serialize;

use super::resource::{Resource, SubTask};
use crate::{AppError, Result};

/// A contiguous, non-empty run of sub-tasks recorded into one artifact.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Chunk {
    /// Index of the first sub-task in the chunk.
    pub start: usize,
    /// One past the index of the last sub-task in the chunk.
    pub end: usize,
}

impl Chunk {
    /// Number of sub-tasks in the chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always `false` for chunks produced by [`partition`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Index range covered by the chunk.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Sub-tasks of `resource` covered by the chunk.
    #[must_use]
    pub fn sub_tasks<'a>(&self, resource: &'a Resource) -> &'a [SubTask] {
        &resource.sub_tasks[self.range()]
    }
}

/// Partition sub-tasks `[resume_index, len)` into chunks of at most `chunk_size`.
///
/// Chunks preserve order and cover the remaining range without gaps or
/// overlaps; only the last chunk may be shorter. An empty remaining range
/// yields no chunks.
///
/// # Errors
///
/// Returns `AppError::Config` if `chunk_size` is zero, or
/// `AppError::Checkpoint` if `resume_index` exceeds `len`.
pub fn partition(len: usize, resume_index: usize, chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(AppError::Config("chunk_size must be greater than zero".into()));
    }
    if resume_index > len {
        return Err(AppError::Checkpoint(format!(
            "resume index {resume_index} exceeds sub-task count {len}"
        )));
    }

    let chunks = (resume_index..len)
        .step_by(chunk_size)
        .map(|start| Chunk {
            start,
            end: start.saturating_add(chunk_size).min(len),
        })
        .collect();
    Ok(chunks)
}
