//! Completion announcements.
//!
//! Once a resource is fully recorded the orchestrator publishes a single
//! [`RecordedEvent`] through the [`Notifier`] capability. [`HttpNotifier`]
//! posts it as JSON to the video server's recording endpoint, which hands the
//! chunk directory to the merger.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::info;

use crate::config::ServerConfig;
use crate::models::event::RecordedEvent;
use crate::{AppError, Result};

/// Publishes completion events.
pub trait Notifier: Send + Sync {
    /// Publish `event` once.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Notify`] if the event could not be delivered.
    fn publish<'a>(
        &'a self,
        event: &'a RecordedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// [`Notifier`] posting to `{base_url}{recorded_endpoint}`.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    http: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    /// Build a notifier for the configured server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` if the HTTP client cannot be constructed.
    pub fn new(server: &ServerConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: format!(
                "{}{}",
                server.base_url.trim_end_matches('/'),
                server.recorded_endpoint
            ),
        })
    }

    /// Endpoint the event is posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for HttpNotifier {
    fn publish<'a>(
        &'a self,
        event: &'a RecordedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .post(&self.url)
                .json(event)
                .send()
                .await
                .map_err(|err| AppError::Notify(format!("post to {} failed: {err}", self.url)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::Notify(format!(
                    "{} returned {status}",
                    self.url
                )));
            }
            info!(slug = event.slug, url = self.url, "completion event published");
            Ok(())
        })
    }
}
