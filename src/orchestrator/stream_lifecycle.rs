//! One capture stream piped into one chunk artifact.
//!
//! ```text
//! Idle --open--> Capturing --flush_and_close--> Draining --> Closed
//! ```
//!
//! `open` starts a pump task that writes every captured frame into the
//! artifact as it arrives. `flush_and_close` signals end-of-stream, waits
//! (bounded by the drain timeout) for the pump to deliver what the source
//! still has, then flushes and syncs the artifact. It only returns once the
//! artifact is closed, so the next chunk's `open` can never overlap it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::artifact::{ArtifactKey, ArtifactStore, ChunkWriter};
use crate::driver::{CaptureFrame, CaptureSource, CaptureStream};
use crate::{AppError, Result};

/// Lifecycle state of a [`StreamLifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created, nothing opened yet.
    Idle,
    /// Capture running, frames piped into the artifact.
    Capturing,
    /// End-of-stream signalled, waiting for the pump to finish.
    Draining,
    /// Artifact flushed and closed.
    Closed,
}

/// Counters gathered while a chunk was captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Bytes written to the artifact.
    pub bytes_written: u64,
    /// Capture errors reported by the source.
    pub capture_errors: u32,
}

struct PumpOutcome {
    writer: Box<dyn ChunkWriter>,
    stats: StreamStats,
    write_error: Option<AppError>,
}

struct ActiveStream {
    stop: CancellationToken,
    detach: CancellationToken,
    pump: JoinHandle<PumpOutcome>,
}

/// Owns the capture stream and output artifact of a single chunk.
pub struct StreamLifecycle {
    key: ArtifactKey,
    location: String,
    drain_timeout: Duration,
    state: StreamState,
    active: Option<ActiveStream>,
}

impl StreamLifecycle {
    /// Create an idle lifecycle for the artifact at `key`.
    #[must_use]
    pub fn new(key: ArtifactKey, drain_timeout: Duration) -> Self {
        Self {
            key,
            location: String::new(),
            drain_timeout,
            state: StreamState::Idle,
            active: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Location of the artifact once opened.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Open the artifact, start the capture, and begin piping frames.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidState` if the lifecycle is not `Idle`.
    /// - `AppError::Io` if the artifact cannot be opened.
    /// - `AppError::Capture` if the capture cannot be started.
    pub async fn open(
        &mut self,
        capture: &dyn CaptureSource,
        artifacts: &dyn ArtifactStore,
    ) -> Result<()> {
        if self.state != StreamState::Idle {
            return Err(AppError::InvalidState(format!(
                "cannot open stream for {} while {:?}",
                self.key.file_name(),
                self.state
            )));
        }

        let writer = artifacts.open(&self.key).await?;
        let stream = capture.start_capture().await?;
        self.location = artifacts.locate(&self.key);

        let stop = stream.stop_token();
        let detach = CancellationToken::new();
        let pump = tokio::spawn(
            pump_frames(stream, writer, detach.clone())
                .instrument(info_span!("capture_pump", artifact = %self.location)),
        );

        self.active = Some(ActiveStream { stop, detach, pump });
        self.state = StreamState::Capturing;
        info!(artifact = %self.location, "chunk capture started");
        Ok(())
    }

    /// Stop the capture, drain it into the artifact, and close the artifact.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidState` if the lifecycle is not `Capturing`.
    /// - `AppError::Io` if writing, flushing or syncing the artifact failed.
    /// - `AppError::Capture` if the pump task panicked.
    pub async fn flush_and_close(&mut self) -> Result<StreamStats> {
        let Some(active) = self.active.take().filter(|_| self.state == StreamState::Capturing)
        else {
            return Err(AppError::InvalidState(format!(
                "cannot close stream for {} while {:?}",
                self.key.file_name(),
                self.state
            )));
        };
        let ActiveStream {
            stop,
            detach,
            mut pump,
        } = active;

        self.state = StreamState::Draining;
        stop.cancel();

        let joined = if let Ok(joined) = tokio::time::timeout(self.drain_timeout, &mut pump).await
        {
            joined
        } else {
            warn!(
                artifact = %self.location,
                timeout = ?self.drain_timeout,
                "capture did not reach end of stream in time, detaching"
            );
            detach.cancel();
            pump.await
        };
        let outcome =
            joined.map_err(|err| AppError::Capture(format!("capture pump failed: {err}")))?;

        let close_result = outcome.writer.close().await;
        self.state = StreamState::Closed;

        if let Some(err) = outcome.write_error {
            return Err(err);
        }
        close_result?;

        info!(
            artifact = %self.location,
            bytes_written = outcome.stats.bytes_written,
            capture_errors = outcome.stats.capture_errors,
            "chunk artifact closed"
        );
        Ok(outcome.stats)
    }
}

impl Drop for StreamLifecycle {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop.cancel();
            active.detach.cancel();
        }
    }
}

async fn pump_frames(
    mut stream: CaptureStream,
    mut writer: Box<dyn ChunkWriter>,
    detach: CancellationToken,
) -> PumpOutcome {
    let mut stats = StreamStats::default();

    let write_error = loop {
        let frame = tokio::select! {
            biased;
            () = detach.cancelled() => break None,
            frame = stream.recv() => frame,
        };

        match frame {
            Some(CaptureFrame::Data(bytes)) => {
                if let Err(err) = writer.write(&bytes).await {
                    stream.stop();
                    break Some(err);
                }
                stats.bytes_written += bytes.len() as u64;
            }
            Some(CaptureFrame::Error(message)) => {
                stats.capture_errors += 1;
                warn!(error = %message, "capture stream error");
            }
            None => {
                debug!("capture stream ended");
                break None;
            }
        }
    };

    PumpOutcome {
        writer,
        stats,
        write_error,
    }
}
