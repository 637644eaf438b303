//! Top-level resource run.

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::progress_reporter::{self, announce_completion};
use super::scheduler::{ChunkReport, ChunkScheduler, ScheduleOutcome};
use super::session_manager::{establish_with_retry, RetryPolicy};
use super::RunContext;
use crate::driver::SessionLocation;
use crate::models::checkpoint;
use crate::models::chunk::partition;
use crate::models::progress::ProgressObservation;
use crate::models::resource::Resource;
use crate::{AppError, Result};

/// Result of a successful [`run_resource`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    /// Identifier attached to every log line of the run.
    pub run_id: String,
    /// Slug of the recorded resource.
    pub resource: String,
    /// Checkpoint the run started from.
    pub resumed_from: usize,
    /// Chunks recorded by this run, in order.
    pub chunks: Vec<ChunkReport>,
    /// Progress observed at each chunk boundary.
    pub observations: Vec<ProgressObservation>,
    /// Every sub-task of the resource is recorded.
    pub completed: bool,
    /// The completion event was delivered.
    pub announced: bool,
}

/// Record `resource` from its stored checkpoint to the end.
///
/// Reads the checkpoint, establishes the session unless nothing remains,
/// records the remaining chunks, finalises the checkpoint and announces
/// completion. The session is closed afterwards whether or not the run
/// succeeded.
///
/// # Errors
///
/// - `AppError::CheckpointUnavailable` if the checkpoint cannot be read.
/// - `AppError::Checkpoint` if the stored checkpoint is out of range.
/// - `AppError::Config` if the chunk size is zero.
/// - `AppError::SessionEstablishment` if authentication never succeeds.
/// - `AppError::Io` / `AppError::Capture` if a chunk cannot be recorded.
/// - `AppError::Cancelled` if the run is cancelled.
pub async fn run_resource(ctx: &RunContext, resource: &Resource) -> Result<RunSummary> {
    let run_id = Uuid::new_v4().to_string();
    let span = info_span!("run_resource", run_id = %run_id, resource = resource.slug);
    async move {
        let result = run_inner(ctx, resource, run_id).await;
        if let Err(err) = ctx.session.close_all().await {
            warn!(%err, "failed to close session");
        }
        result
    }
    .instrument(span)
    .await
}

async fn run_inner(ctx: &RunContext, resource: &Resource, run_id: String) -> Result<RunSummary> {
    let stored = tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => return Err(AppError::Cancelled),
        stored = ctx.store.get(&resource.slug) => stored?,
    };
    let resumed_from = checkpoint::validate(resource, stored.unwrap_or(0))?;
    let observation =
        progress_reporter::report(resource, resumed_from, ctx.config.recorder.progress_metric);
    info!(
        resumed_from,
        sub_tasks = resource.len(),
        percentage = observation.percentage,
        "checkpoint loaded"
    );

    let outcome = record_remaining(ctx, resource, resumed_from).await?;

    finalize_checkpoint(ctx, resource).await;
    let announced = announce_completion(ctx, resource).await;
    info!(chunks = outcome.chunks.len(), "resource recorded");

    Ok(RunSummary {
        run_id,
        resource: resource.slug.clone(),
        resumed_from,
        chunks: outcome.chunks,
        observations: outcome.observations,
        completed: true,
        announced,
    })
}

async fn record_remaining(
    ctx: &RunContext,
    resource: &Resource,
    resumed_from: usize,
) -> Result<ScheduleOutcome> {
    let config = &ctx.config;
    let chunk_size = config.recorder.chunk_size;

    if partition(resource.len(), resumed_from, chunk_size)?.is_empty() {
        info!("nothing left to record, skipping session establishment");
        return Ok(ScheduleOutcome::default());
    }

    establish_with_retry(
        ctx.session.as_ref(),
        &config.credentials,
        &SessionLocation::new(config.session.login_url.as_str()),
        &RetryPolicy::from_config(&config.session),
        &ctx.cancel,
    )
    .await?;

    ChunkScheduler::new(ctx, resource)
        .run(resumed_from, chunk_size)
        .await
}

async fn finalize_checkpoint(ctx: &RunContext, resource: &Resource) {
    let slug = &resource.slug;
    let result = if ctx.config.recorder.clear_checkpoint_on_completion {
        ctx.store.delete(slug).await
    } else {
        ctx.store.set(slug, resource.len() as u64).await
    };
    if let Err(err) = result {
        warn!(resource = slug, %err, "failed to finalize checkpoint");
    }
}
