//! Capture source backed by an external capture process.
//!
//! Every [`CaptureSource::start_capture`] call spawns the configured command
//! (for example an `ffmpeg` screen/audio grab writing a container to stdout)
//! and forwards its stdout as [`CaptureFrame::Data`]. Stopping the stream
//! sends the configured signal so the encoder can finalise its container,
//! then keeps forwarding output until the process closes stdout.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{CaptureFrame, CaptureSource, CaptureStream};
use crate::config::CaptureConfig;
use crate::{AppError, Result};

/// Frames buffered between the capture process and the artifact writer.
const CHANNEL_CAPACITY: usize = 64;

/// [`CaptureSource`] that records the stdout of a spawned command.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
    stop_signal: String,
}

impl CommandCapture {
    /// Build a capture source from configuration.
    #[must_use]
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            stop_signal: config.stop_signal.clone(),
        }
    }

    fn spawn_process(&self) -> Result<(Child, ChildStdout)> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| AppError::Capture(format!("failed to spawn capture: {err}")))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AppError::Capture("failed to capture stdout of capture process".into())
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(
                async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(line, "capture stderr");
                    }
                }
                .instrument(info_span!("capture_stderr")),
            );
        }
        Ok((child, stdout))
    }
}

impl CaptureSource for CommandCapture {
    fn start_capture(&self) -> Pin<Box<dyn Future<Output = Result<CaptureStream>> + Send + '_>> {
        Box::pin(async move {
            let (child, stdout) = self.spawn_process()?;
            info!(program = %self.program, pid = child.id(), "capture process started");

            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            let stop = CancellationToken::new();
            tokio::spawn(
                forward_output(child, stdout, tx, stop.clone(), self.stop_signal.clone())
                    .instrument(info_span!("capture_process")),
            );
            Ok(CaptureStream::new(rx, stop))
        })
    }
}

async fn forward_output(
    mut child: Child,
    stdout: ChildStdout,
    tx: mpsc::Sender<CaptureFrame>,
    stop: CancellationToken,
    stop_signal: String,
) {
    let mut output = ReaderStream::new(stdout);
    let mut stop_requested = false;

    loop {
        tokio::select! {
            () = stop.cancelled(), if !stop_requested => {
                stop_requested = true;
                request_stop(&mut child, &stop_signal);
            }
            () = tx.closed() => {
                debug!("capture receiver detached, killing process");
                child.start_kill().ok();
                break;
            }
            next = output.next() => match next {
                Some(Ok(bytes)) => {
                    if tx.send(CaptureFrame::Data(bytes)).await.is_err() {
                        debug!("capture receiver dropped, killing process");
                        child.start_kill().ok();
                        break;
                    }
                }
                Some(Err(err)) => {
                    let _ = tx.send(CaptureFrame::Error(format!("read failed: {err}"))).await;
                    break;
                }
                None => break,
            }
        }
    }

    match child.wait().await {
        Ok(status) if status.success() || stop_requested => {
            info!(?status, "capture process exited");
        }
        Ok(status) => {
            let _ = tx
                .send(CaptureFrame::Error(format!("capture process exited early: {status}")))
                .await;
        }
        Err(err) => {
            warn!(%err, "error waiting for capture process");
        }
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child, signal_name: &str) {
    use std::str::FromStr;

    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let signalled = Signal::from_str(signal_name)
        .ok()
        .zip(child.id().and_then(|id| i32::try_from(id).ok()))
        .is_some_and(|(signal, pid)| kill(Pid::from_raw(pid), signal).is_ok());

    if signalled {
        debug!(signal = signal_name, "sent stop signal to capture process");
    } else {
        warn!(signal = signal_name, "could not signal capture process, killing it");
        child.start_kill().ok();
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child, _signal_name: &str) {
    child.start_kill().ok();
}
