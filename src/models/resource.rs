//! Resource and sub-task definitions loaded from configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the resource slug in URL templates.
pub const RESOURCE_SLUG_PLACEHOLDER: &str = "<course-slug>";
/// Placeholder substituted with the sub-task identifier in URL templates.
pub const SUB_TASK_ID_PLACEHOLDER: &str = "<lesson-id>";
/// Placeholder substituted with the sub-task slug in URL templates.
pub const SUB_TASK_SLUG_PLACEHOLDER: &str = "<lesson-slug>";

/// An individually navigable segment of a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SubTask {
    /// Identifier used by the remote site (numeric lesson id).
    pub id: u64,
    /// URL slug of the sub-task.
    pub slug: String,
    /// Human-readable name; falls back to the slug when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Estimated play time in whole minutes.
    pub duration_minutes: u32,
}

impl SubTask {
    /// Display name used in log lines.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.slug)
    }

    /// Estimated play time as a [`Duration`].
    #[must_use]
    pub fn estimated_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_minutes) * 60)
    }
}

/// The unit of work being captured: an ordered list of sub-tasks.
///
/// Sub-task order is execution order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Resource {
    /// Resource slug; also the checkpoint key and artifact name prefix.
    pub slug: String,
    /// Display name; used as the title of the completion event.
    pub name: String,
    /// Ordered sub-tasks.
    pub sub_tasks: Vec<SubTask>,
}

impl Resource {
    /// Number of sub-tasks in the resource.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sub_tasks.len()
    }

    /// Whether the resource contains no sub-tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sub_tasks.is_empty()
    }

    /// Sum of the estimated durations of all sub-tasks, in minutes.
    #[must_use]
    pub fn total_minutes(&self) -> u64 {
        self.minutes_before(self.sub_tasks.len())
    }

    /// Sum of the estimated durations of the first `index` sub-tasks, in minutes.
    ///
    /// `index` is clamped to the sub-task count.
    #[must_use]
    pub fn minutes_before(&self, index: usize) -> u64 {
        self.sub_tasks
            .iter()
            .take(index)
            .map(|task| u64::from(task.duration_minutes))
            .sum()
    }

    /// Expand a sub-task URL template for `sub_task`.
    #[must_use]
    pub fn sub_task_url(&self, template: &str, sub_task: &SubTask) -> String {
        template
            .replace(RESOURCE_SLUG_PLACEHOLDER, &self.slug)
            .replace(SUB_TASK_ID_PLACEHOLDER, &sub_task.id.to_string())
            .replace(SUB_TASK_SLUG_PLACEHOLDER, &sub_task.slug)
    }
}
