//! Completion event published once a resource is fully recorded.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::resource::Resource;

/// Payload announcing that every chunk of a resource is on disk.
///
/// `path` and `chunk_dir_path` carry the same directory: the former is read by
/// the recording endpoint, the latter by the chunk merger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEvent {
    /// Resource display name.
    pub title: String,
    /// Resource slug; prefix of every chunk file name.
    pub slug: String,
    /// Directory containing the chunk files.
    pub path: String,
    /// Directory containing the chunk files.
    pub chunk_dir_path: String,
    /// Chunk file extension without the leading dot.
    pub extension: String,
    /// Directory the merged output should be written to.
    pub output_path: String,
}

impl RecordedEvent {
    /// Build the event for `resource`.
    #[must_use]
    pub fn new(resource: &Resource, chunk_dir: &Path, extension: &str, output_dir: &Path) -> Self {
        let chunk_dir = chunk_dir.to_string_lossy().into_owned();
        Self {
            title: resource.name.clone(),
            slug: resource.slug.clone(),
            path: chunk_dir.clone(),
            chunk_dir_path: chunk_dir,
            extension: extension.to_owned(),
            output_path: output_dir.to_string_lossy().into_owned(),
        }
    }
}
