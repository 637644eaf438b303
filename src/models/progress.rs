//! Completion percentage for a resource at a given checkpoint.

use serde::{Deserialize, Serialize};

use super::resource::Resource;

/// Which quantity the completion percentage is weighted by.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMetric {
    /// Ratio of completed estimated minutes to total estimated minutes.
    #[default]
    Duration,
    /// Ratio of completed sub-tasks to total sub-tasks.
    Count,
}

/// A progress observation emitted at a chunk boundary.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ProgressObservation {
    /// Checkpoint value after the chunk closed.
    pub checkpoint: usize,
    /// Completion percentage, rounded to one decimal place.
    pub percentage: f64,
}

/// Completion percentage of `resource` once `checkpoint` sub-tasks are done.
///
/// Rounded to one decimal place. Defined as `0.0` when the weighted total is
/// zero. `checkpoint` is clamped to the sub-task count.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Minute and sub-task totals are far below 2^52.
pub fn completion_percentage(
    resource: &Resource,
    checkpoint: usize,
    metric: ProgressMetric,
) -> f64 {
    let (done, total) = match metric {
        ProgressMetric::Duration => (resource.minutes_before(checkpoint), resource.total_minutes()),
        ProgressMetric::Count => (checkpoint.min(resource.len()) as u64, resource.len() as u64),
    };
    if total == 0 {
        return 0.0;
    }
    round_one_decimal(done as f64 / total as f64 * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
