//! Chunk scheduler: drives the remaining sub-tasks chunk by chunk.
//!
//! Per chunk the checkpoint is first set to the chunk start, so a crash
//! mid-chunk re-records that chunk from its first sub-task. The checkpoint
//! only moves to the chunk end after the chunk artifact is closed.

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use super::progress_reporter;
use super::stream_lifecycle::StreamLifecycle;
use super::{sleep_or_cancel, RunContext};
use crate::artifact::ArtifactKey;
use crate::driver::SubTaskRef;
use crate::models::chunk::{partition, Chunk};
use crate::models::progress::ProgressObservation;
use crate::models::resource::{Resource, SubTask};
use crate::{AppError, Result};

/// Outcome of one recorded chunk.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChunkReport {
    /// Sub-task range covered.
    pub chunk: Chunk,
    /// Where the artifact was written.
    pub artifact: String,
    /// Bytes written to the artifact.
    pub bytes_written: u64,
    /// Capture errors observed while recording.
    pub capture_errors: u32,
}

/// Everything the scheduler produced for a resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleOutcome {
    /// One report per chunk, in order.
    pub chunks: Vec<ChunkReport>,
    /// One observation per chunk boundary, in order.
    pub observations: Vec<ProgressObservation>,
}

/// Drives the chunks of one resource against a [`RunContext`].
pub struct ChunkScheduler<'a> {
    ctx: &'a RunContext,
    resource: &'a Resource,
}

impl<'a> ChunkScheduler<'a> {
    /// Bind the scheduler to a run context and resource.
    #[must_use]
    pub fn new(ctx: &'a RunContext, resource: &'a Resource) -> Self {
        Self { ctx, resource }
    }

    /// Record sub-tasks `[resume_index, len)` in chunks of at most `chunk_size`.
    ///
    /// An empty remaining range is a no-op.
    ///
    /// # Errors
    ///
    /// - `AppError::Config` if `chunk_size` is zero.
    /// - `AppError::Checkpoint` if `resume_index` is past the end.
    /// - `AppError::Io` or `AppError::Capture` if a chunk cannot be opened or closed.
    /// - Any [`AppError::is_fatal`] error from navigation; other navigation
    ///   failures are logged and the sub-task is still waited out.
    /// - `AppError::Cancelled` if the run is cancelled.
    pub async fn run(&self, resume_index: usize, chunk_size: usize) -> Result<ScheduleOutcome> {
        let chunks = partition(self.resource.len(), resume_index, chunk_size)?;
        info!(
            resource = self.resource.slug,
            resume_index,
            chunk_size,
            chunks = chunks.len(),
            "chunk plan ready"
        );

        let mut outcome = ScheduleOutcome::default();
        for chunk in chunks {
            let span = info_span!("record_chunk", chunk_start = chunk.start, chunk_end = chunk.end);
            let report = self.record_chunk(chunk).instrument(span).await?;

            self.write_checkpoint(chunk.end).await;
            let metric = self.ctx.config.recorder.progress_metric;
            let observation = progress_reporter::report(self.resource, chunk.end, metric);
            info!(
                resource = self.resource.slug,
                checkpoint = observation.checkpoint,
                percentage = observation.percentage,
                "progress"
            );

            outcome.chunks.push(report);
            outcome.observations.push(observation);
        }
        Ok(outcome)
    }

    async fn record_chunk(&self, chunk: Chunk) -> Result<ChunkReport> {
        let config = &self.ctx.config;
        self.write_checkpoint(chunk.start).await;

        let key = ArtifactKey::new(&self.resource.slug, chunk.start, &config.extension);
        let mut lifecycle = StreamLifecycle::new(key, config.drain_timeout());
        lifecycle
            .open(self.ctx.capture.as_ref(), self.ctx.artifacts.as_ref())
            .await?;

        for (offset, sub_task) in chunk.sub_tasks(self.resource).iter().enumerate() {
            if let Err(err) = self.drive_sub_task(chunk.start + offset, sub_task).await {
                if let Err(close_err) = lifecycle.flush_and_close().await {
                    warn!(%close_err, "failed to close interrupted chunk");
                }
                return Err(err);
            }
        }

        let stats = lifecycle.flush_and_close().await?;
        Ok(ChunkReport {
            chunk,
            artifact: lifecycle.location().to_owned(),
            bytes_written: stats.bytes_written,
            capture_errors: stats.capture_errors,
        })
    }

    async fn drive_sub_task(&self, index: usize, sub_task: &SubTask) -> Result<()> {
        let config = &self.ctx.config;
        let cancel = &self.ctx.cancel;
        let target = SubTaskRef {
            index,
            slug: sub_task.slug.clone(),
            url: self.resource.sub_task_url(&config.session.lesson_url, sub_task),
        };
        info!(
            sub_task = index,
            name = sub_task.display_name(),
            minutes = sub_task.duration_minutes,
            "recording sub-task"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AppError::Cancelled),
            result = self.ctx.session.navigate_sub_task(&target) => match result {
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => warn!(sub_task = index, url = target.url, %err, "navigation failed"),
                Ok(()) => {}
            }
        }

        sleep_or_cancel(sub_task.estimated_duration() + config.settle_margin(), cancel).await
    }

    async fn write_checkpoint(&self, value: usize) {
        let slug = &self.resource.slug;
        match self.ctx.store.set(slug, value as u64).await {
            Ok(()) => info!(resource = slug, checkpoint = value, "checkpoint written"),
            Err(err) => warn!(resource = slug, checkpoint = value, %err, "checkpoint write failed"),
        }
    }
}
