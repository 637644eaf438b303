//! Checkpoint marker wire form and bounds validation.
//!
//! A checkpoint is the number of sub-tasks of a resource that are fully
//! recorded. The HTTP marker service stores it as a small JSON object.

use serde::{Deserialize, Serialize};

use super::resource::Resource;
use crate::{AppError, Result};

/// JSON body exchanged with the marker endpoints of the video server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointMarker {
    /// Number of completed sub-tasks.
    pub lesson_index: u64,
    /// Slug of the sub-task the index points at, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_slug: Option<String>,
}

/// Check that a stored checkpoint lies within `0..=resource.len()`.
///
/// # Errors
///
/// Returns `AppError::Checkpoint` when the stored value points past the end.
pub fn validate(resource: &Resource, stored: u64) -> Result<usize> {
    usize::try_from(stored)
        .ok()
        .filter(|index| *index <= resource.len())
        .ok_or_else(|| {
            AppError::Checkpoint(format!(
                "stored checkpoint {stored} for {} exceeds sub-task count {}",
                resource.slug,
                resource.len()
            ))
        })
}
