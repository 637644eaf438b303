//! Session establishment with bounded retry.
//!
//! An attempt authenticates, waits for the session to settle, then compares
//! the current location with the entry location. A session still sitting at
//! the entry location did not authenticate. Attempts are independent; the
//! delay between them doubles up to a ceiling.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::sleep_or_cancel;
use crate::config::SessionConfig;
use crate::driver::{Credentials, SessionDriver, SessionLocation};
use crate::{AppError, Result};

/// Attempt ceiling and pacing for [`establish_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one is always made).
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Cap on the doubled delay.
    pub max_delay: Duration,
    /// Wait between authenticating and re-checking the location.
    pub settle: Duration,
}

impl RetryPolicy {
    /// Policy described by the `[session]` configuration section.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            settle: Duration::from_secs(config.settle_seconds),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Establish the session, retrying up to `policy.max_attempts` times.
///
/// Returns the authenticated location.
///
/// # Errors
///
/// - `AppError::SessionEstablishment` once every attempt has failed.
/// - `AppError::Cancelled` if `cancel` fires while waiting.
pub async fn establish_with_retry(
    session: &dyn SessionDriver,
    credentials: &Credentials,
    entry: &SessionLocation,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<SessionLocation> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let outcome = attempt_once(session, credentials, entry, policy.settle, cancel)
            .instrument(info_span!("establish_session", attempt, max_attempts))
            .await;

        match outcome {
            Ok(location) => {
                info!(attempt, %location, "session established");
                return Ok(location);
            }
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(err) => {
                warn!(attempt, max_attempts, %err, "session establishment attempt failed");
            }
        }

        if attempt < max_attempts {
            sleep_or_cancel(policy.delay_after(attempt), cancel).await?;
        }
    }

    Err(AppError::SessionEstablishment(format!(
        "session did not advance past {entry} after {max_attempts} attempts"
    )))
}

async fn attempt_once(
    session: &dyn SessionDriver,
    credentials: &Credentials,
    entry: &SessionLocation,
    settle: Duration,
    cancel: &CancellationToken,
) -> Result<SessionLocation> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(AppError::Cancelled),
        result = session.establish(credentials) => {
            result?;
        }
    }

    sleep_or_cancel(settle, cancel).await?;

    let location = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(AppError::Cancelled),
        result = session.current_location() => result?,
    };

    if &location == entry {
        return Err(AppError::Session(format!(
            "session still at entry location {location}"
        )));
    }
    Ok(location)
}
