//! HTTP checkpoint store backed by the video server's marker endpoints.
//!
//! `GET`, `POST` and `DELETE` on `{base_url}{marker_endpoint}` with the
//! `<video-slug>` placeholder replaced by the resource slug. A `404` on `GET`
//! means no checkpoint has been stored yet. Markers written for a known
//! resource also carry the slug of the sub-task the index points at.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info};

use super::CheckpointStore;
use crate::config::ServerConfig;
use crate::models::checkpoint::CheckpointMarker;
use crate::models::resource::Resource;
use crate::{AppError, Result};

/// Placeholder substituted with the resource slug in the marker endpoint.
pub const SLUG_PLACEHOLDER: &str = "<video-slug>";

/// [`CheckpointStore`] talking to the video server over HTTP.
#[derive(Debug, Clone)]
pub struct MarkerClient {
    http: reqwest::Client,
    base_url: String,
    endpoint: String,
    sub_task_slugs: HashMap<String, Vec<String>>,
}

impl MarkerClient {
    /// Build a client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` if the HTTP client cannot be constructed.
    pub fn new(server: &ServerConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: server.base_url.trim_end_matches('/').to_owned(),
            endpoint: server.marker_endpoint.clone(),
            sub_task_slugs: HashMap::new(),
        })
    }

    /// Register the resources whose markers should name their sub-task.
    #[must_use]
    pub fn with_catalog(mut self, resources: &[Resource]) -> Self {
        self.sub_task_slugs = resources
            .iter()
            .map(|resource| {
                let slugs = resource.sub_tasks.iter().map(|task| task.slug.clone()).collect();
                (resource.slug.clone(), slugs)
            })
            .collect();
        self
    }

    /// Marker body stored for `value` completed sub-tasks of `slug`.
    #[must_use]
    pub fn marker(&self, slug: &str, value: u64) -> CheckpointMarker {
        let lesson_slug = self.sub_task_slugs.get(slug).and_then(|slugs| {
            usize::try_from(value)
                .ok()
                .and_then(|index| slugs.get(index))
                .cloned()
        });
        CheckpointMarker {
            lesson_index: value,
            lesson_slug,
        }
    }

    /// Marker URL for a resource slug.
    #[must_use]
    pub fn marker_url(&self, slug: &str) -> String {
        format!("{}{}", self.base_url, self.endpoint.replace(SLUG_PLACEHOLDER, slug))
    }

    async fn fetch(&self, slug: &str) -> Result<Option<u64>> {
        let response = self
            .http
            .get(self.marker_url(slug))
            .send()
            .await
            .map_err(|err| AppError::CheckpointUnavailable(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(slug, "no checkpoint marker stored");
                Ok(None)
            }
            status if status.is_success() => {
                let marker: CheckpointMarker = response.json().await.map_err(|err| {
                    AppError::Checkpoint(format!("malformed marker for {slug}: {err}"))
                })?;
                Ok(Some(marker.lesson_index))
            }
            status => Err(AppError::CheckpointUnavailable(format!(
                "marker lookup for {slug} returned {status}"
            ))),
        }
    }

    async fn store(&self, slug: &str, value: u64) -> Result<()> {
        let marker = self.marker(slug, value);
        let response = self
            .http
            .post(self.marker_url(slug))
            .json(&marker)
            .send()
            .await
            .map_err(|err| AppError::Checkpoint(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Checkpoint(format!(
                "marker write for {slug} returned {status}"
            )));
        }
        info!(slug, lesson_index = value, "checkpoint marker set");
        Ok(())
    }

    async fn remove(&self, slug: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.marker_url(slug))
            .send()
            .await
            .map_err(|err| AppError::Checkpoint(err.to_string()))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(AppError::Checkpoint(format!(
                "marker delete for {slug} returned {status}"
            )));
        }
        info!(slug, "checkpoint marker deleted");
        Ok(())
    }
}

impl CheckpointStore for MarkerClient {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<u64>>> + Send + 'a>> {
        Box::pin(self.fetch(key))
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.store(key, value))
    }

    fn delete<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.remove(key))
    }
}
