//! Explicit run context shared by the orchestrator components.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::artifact::ArtifactStore;
use crate::config::GlobalConfig;
use crate::driver::{CaptureSource, SessionDriver};
use crate::notify::Notifier;
use crate::persistence::CheckpointStore;

/// Everything one resource run needs: configuration, the collaborator
/// capabilities, and the cancellation token.
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct RunContext {
    /// Immutable configuration for the run.
    pub config: Arc<GlobalConfig>,
    /// The single interactive session.
    pub session: Arc<dyn SessionDriver>,
    /// Source of capture streams bound to the session.
    pub capture: Arc<dyn CaptureSource>,
    /// Durable checkpoint store.
    pub store: Arc<dyn CheckpointStore>,
    /// Sink factory for chunk artifacts.
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Completion event publisher.
    pub notifier: Arc<dyn Notifier>,
    /// Cancelled when the run must abort.
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Assemble a context with a fresh cancellation token.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        session: Arc<dyn SessionDriver>,
        capture: Arc<dyn CaptureSource>,
        store: Arc<dyn CheckpointStore>,
        artifacts: Arc<dyn ArtifactStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            session,
            capture,
            store,
            artifacts,
            notifier,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token, e.g. with one wired to OS signals.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
