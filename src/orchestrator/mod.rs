//! Resource run orchestration.
//!
//! [`run::run_resource`] reads the checkpoint, establishes the session
//! ([`session_manager`]), drives the remaining chunks ([`scheduler`]) through
//! one [`stream_lifecycle::StreamLifecycle`] per chunk, and reports progress
//! and completion ([`progress_reporter`]).

pub mod context;
pub mod progress_reporter;
pub mod run;
pub mod scheduler;
pub mod session_manager;
pub mod stream_lifecycle;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{AppError, Result};

pub use context::RunContext;
pub use run::{run_resource, RunSummary};

/// Sleep for `duration` unless `cancel` fires first.
///
/// # Errors
///
/// Returns `AppError::Cancelled` if the token is cancelled before the sleep ends.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AppError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}
