//! Capability abstractions over the interactive session and its capture.
//!
//! The orchestrator only talks to the remote site and the media source
//! through [`SessionDriver`] and [`CaptureSource`], so the recording loop can
//! run against the helper-process backends in production and against fakes
//! in tests.

pub mod codec;
pub mod command;
pub mod helper;

use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Opaque, comparable location of the interactive session (a URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionLocation(String);

impl SessionLocation {
    /// Wrap a raw location string.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Raw location string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Login credentials for the remote site.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account e-mail.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reference to the sub-task a session should navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTaskRef {
    /// Position of the sub-task within its resource.
    pub index: usize,
    /// Sub-task slug.
    pub slug: String,
    /// Fully expanded sub-task URL.
    pub url: String,
}

/// Interface to the single long-lived interactive session.
pub trait SessionDriver: Send + Sync {
    /// Authenticate with `credentials` and report the resulting location.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`](crate::AppError::Session) or
    /// [`AppError::Protocol`](crate::AppError::Protocol) if the backend fails.
    fn establish<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<SessionLocation>> + Send + 'a>>;

    /// Navigate the session to a sub-task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`](crate::AppError::Session) if navigation fails.
    fn navigate_sub_task<'a>(
        &'a self,
        target: &'a SubTaskRef,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Current location of the session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`](crate::AppError::Session) if the backend fails.
    fn current_location(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<SessionLocation>> + Send + '_>>;

    /// Close every page and the session itself. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`](crate::AppError::Session) if teardown fails.
    fn close_all(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// One unit of output from a capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureFrame {
    /// Captured media bytes.
    Data(Bytes),
    /// The source reported an error; the stream may continue afterwards.
    Error(String),
}

/// A live capture stream bound to the session's audio/visual output.
///
/// Frames arrive on an mpsc channel. Cancelling the stop token asks the
/// source to finish; the source then closes the channel once its remaining
/// output has been delivered.
#[derive(Debug)]
pub struct CaptureStream {
    frames: mpsc::Receiver<CaptureFrame>,
    stop: CancellationToken,
}

impl CaptureStream {
    /// Assemble a stream from its frame channel and stop token.
    #[must_use]
    pub fn new(frames: mpsc::Receiver<CaptureFrame>, stop: CancellationToken) -> Self {
        Self { frames, stop }
    }

    /// Receive the next frame; `None` once the source has ended.
    pub async fn recv(&mut self) -> Option<CaptureFrame> {
        self.frames.recv().await
    }

    /// Signal end-of-stream to the source.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Token cancelled when the stream is asked to stop.
    #[must_use]
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}

/// Source of continuous media bytes tied to a live session.
pub trait CaptureSource: Send + Sync {
    /// Begin capturing the session's current output.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Capture`](crate::AppError::Capture) if the capture
    /// cannot be started.
    fn start_capture(&self) -> Pin<Box<dyn Future<Output = Result<CaptureStream>> + Send + '_>>;
}
