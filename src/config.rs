//! Global configuration parsing, validation, and credential loading.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::driver::Credentials;
use crate::models::progress::ProgressMetric;
use crate::models::resource::Resource;
use crate::{AppError, Result};

/// Keychain service name holding the session credentials.
pub const KEYRING_SERVICE: &str = "video-recorder";

/// Chunking and pacing of the recording loop.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RecorderConfig {
    /// Maximum number of sub-tasks recorded into one chunk artifact.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Extra wait added to every sub-task's estimated duration.
    #[serde(default = "default_settle_margin")]
    pub settle_margin_seconds: u64,
    /// Upper bound on waiting for the capture to drain at a chunk boundary.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
    /// Weighting used for progress percentages.
    #[serde(default)]
    pub progress_metric: ProgressMetric,
    /// Delete the stored checkpoint once the resource is fully recorded.
    #[serde(default = "default_true")]
    pub clear_checkpoint_on_completion: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            settle_margin_seconds: default_settle_margin(),
            drain_timeout_seconds: default_drain_timeout(),
            progress_metric: ProgressMetric::default(),
            clear_checkpoint_on_completion: true,
        }
    }
}

/// Session helper process and authentication retry settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Entry (pre-authentication) location of the remote site.
    pub login_url: String,
    /// Sub-task URL template with `<course-slug>`, `<lesson-id>`, `<lesson-slug>`.
    pub lesson_url: String,
    /// Helper binary driving the interactive session (e.g. `node`).
    pub helper_cli: String,
    /// Arguments passed to the helper binary.
    #[serde(default)]
    pub helper_cli_args: Vec<String>,
    /// Maximum time to wait for the helper's ready line.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_seconds: u64,
    /// Maximum time to wait for a helper response.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Wait after authenticating before the location is re-checked.
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: u64,
    /// Authentication attempts before the run is aborted.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First delay between authentication attempts.
    #[serde(default = "default_retry_initial_delay")]
    pub retry_initial_delay_ms: u64,
    /// Cap on the doubled delay between authentication attempts.
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,
}

/// External capture process settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CaptureConfig {
    /// Capture binary writing the media container to stdout (e.g. `ffmpeg`).
    pub command: String,
    /// Arguments passed to the capture binary.
    #[serde(default)]
    pub args: Vec<String>,
    /// Signal sent to request a graceful stop (`SIGINT`, `SIGTERM`, ...).
    #[serde(default = "default_stop_signal")]
    pub stop_signal: String,
}

/// Which checkpoint store backend to use.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointBackend {
    /// Marker endpoints of the video server.
    #[default]
    Http,
    /// Local `SQLite` database.
    Sqlite,
}

/// Checkpoint store selection.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CheckpointConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: CheckpointBackend,
    /// Database file for the `sqlite` backend.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Video server endpoints used for markers and completion events.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Base URL, e.g. `http://video-server:3000`.
    pub base_url: String,
    /// Marker endpoint path with a `<video-slug>` placeholder.
    #[serde(default = "default_marker_endpoint")]
    pub marker_endpoint: String,
    /// Endpoint receiving the completion event.
    #[serde(default = "default_recorded_endpoint")]
    pub recorded_endpoint: String,
    /// Per-request timeout.
    #[serde(default = "default_http_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_chunk_size() -> usize {
    4
}

fn default_settle_margin() -> u64 {
    60
}

fn default_drain_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_startup_timeout() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    120
}

fn default_settle_seconds() -> u64 {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_initial_delay() -> u64 {
    1_000
}

fn default_retry_max_delay() -> u64 {
    30_000
}

fn default_stop_signal() -> String {
    "SIGINT".into()
}

fn default_marker_endpoint() -> String {
    "/videos/<video-slug>/markers".into()
}

fn default_recorded_endpoint() -> String {
    "/videos/record".into()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_extension() -> String {
    "webm".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Directory chunk artifacts are written to.
    pub video_dir_path: PathBuf,
    /// Directory the merged recording should land in; forwarded in the completion event.
    pub output_path: PathBuf,
    /// Artifact file extension without the leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Slug of the resource to record when none is given on the command line.
    #[serde(default)]
    pub resource: Option<String>,
    /// Chunking and pacing.
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Interactive session settings.
    pub session: SessionConfig,
    /// Capture process settings.
    pub capture: CaptureConfig,
    /// Checkpoint store selection.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Video server endpoints.
    pub server: ServerConfig,
    /// Catalog of recordable resources.
    pub resources: Vec<Resource>,
    /// Session credentials (populated at runtime).
    #[serde(skip)]
    pub credentials: Credentials,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load session credentials from OS keychain with env-var fallback.
    ///
    /// Tries the `video-recorder` keyring service first, then falls back to
    /// `RECORDER_EMAIL` / `RECORDER_PASSWORD` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the required values.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.credentials = Credentials {
            email: load_credential("email", "RECORDER_EMAIL").await?,
            password: load_credential("password", "RECORDER_PASSWORD").await?,
        };
        Ok(())
    }

    /// Look up a resource from the catalog by slug.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if no resource has that slug.
    pub fn resource(&self, slug: &str) -> Result<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.slug == slug)
            .ok_or_else(|| AppError::Config(format!("unknown resource: {slug}")))
    }

    /// Resolve the resource to record: the explicit `slug` if given, otherwise
    /// the configured default.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when neither names a catalog entry.
    pub fn select_resource(&self, slug: Option<&str>) -> Result<&Resource> {
        let slug = slug
            .or(self.resource.as_deref())
            .ok_or_else(|| AppError::Config("no resource selected".into()))?;
        self.resource(slug)
    }

    /// Override the chunk size, re-checking it is positive.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `chunk_size` is zero.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be greater than zero".into()));
        }
        self.recorder.chunk_size = chunk_size;
        Ok(())
    }

    /// Extra wait added after each sub-task.
    #[must_use]
    pub fn settle_margin(&self) -> Duration {
        Duration::from_secs(self.recorder.settle_margin_seconds)
    }

    /// Bound on draining the capture at a chunk boundary.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.recorder.drain_timeout_seconds)
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.recorder.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be greater than zero".into()));
        }

        if self.session.max_attempts == 0 {
            return Err(AppError::Config("max_attempts must be greater than zero".into()));
        }

        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(AppError::Config(
                "extension must be non-empty and given without a leading dot".into(),
            ));
        }

        if self.resources.is_empty() {
            return Err(AppError::Config("resources must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.slug.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate resource slug: {}",
                    resource.slug
                )));
            }
            if let Some(task) = resource.sub_tasks.iter().find(|t| t.duration_minutes == 0) {
                return Err(AppError::Config(format!(
                    "sub-task {} of {} must have a positive duration",
                    task.slug, resource.slug
                )));
            }
        }

        if let Some(slug) = &self.resource {
            self.resource(slug)?;
        }

        if self.checkpoint.backend == CheckpointBackend::Sqlite && self.checkpoint.db_path.is_none()
        {
            return Err(AppError::Config(
                "checkpoint.db_path is required for the sqlite backend".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
