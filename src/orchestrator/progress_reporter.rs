//! Progress observations and the completion announcement.

use tracing::{info, warn};

use super::RunContext;
use crate::models::event::RecordedEvent;
use crate::models::progress::{completion_percentage, ProgressMetric, ProgressObservation};
use crate::models::resource::Resource;

/// Progress of `resource` once `checkpoint` sub-tasks are complete.
#[must_use]
pub fn report(
    resource: &Resource,
    checkpoint: usize,
    metric: ProgressMetric,
) -> ProgressObservation {
    ProgressObservation {
        checkpoint,
        percentage: completion_percentage(resource, checkpoint, metric),
    }
}

/// Publish the completion event for `resource` exactly once.
///
/// A delivery failure is logged and reported as `false`; it never fails the
/// run, because the chunk artifacts are already durable.
pub async fn announce_completion(ctx: &RunContext, resource: &Resource) -> bool {
    let event = RecordedEvent::new(
        resource,
        &ctx.config.video_dir_path,
        &ctx.config.extension,
        &ctx.config.output_path,
    );

    match ctx.notifier.publish(&event).await {
        Ok(()) => {
            info!(resource = resource.slug, "recording announced");
            true
        }
        Err(err) => {
            warn!(resource = resource.slug, %err, "failed to announce completed recording");
            false
        }
    }
}
