//! Session driver backed by an external helper process.
//!
//! The helper (typically a headless-browser script) is spawned once per run
//! and speaks request/response NDJSON over its stdio:
//!
//! | Method              | Params                          | Result         |
//! |---------------------|---------------------------------|----------------|
//! | `session/establish` | `loginUrl`, `email`, `password` | `location`     |
//! | `session/navigate`  | `url`                           | *(ignored)*    |
//! | `session/location`  | *(none)*                        | `location`     |
//! | `session/close`     | *(none)*                        | *(ignored)*    |
//!
//! Responses carry the request `id` and either a `result` or an
//! `error.message`. Lines without a matching `id` are skipped.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, info_span, warn, Instrument};

use super::codec::HelperCodec;
use super::{Credentials, SessionDriver, SessionLocation, SubTaskRef};
use crate::{AppError, Result};

/// Environment variables inherited by the helper process.
///
/// Credentials are sent over stdin, never through the environment.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "RUST_LOG",
    "DISPLAY",
    "XAUTHORITY",
    "WAYLAND_DISPLAY",
    "PULSE_SERVER",
    "NODE_PATH",
    "TMPDIR",
    "LANG",
];

/// Grace period for the helper to exit after `session/close`.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Configuration for spawning the session helper.
#[derive(Debug, Clone)]
pub struct HelperConfig {
    /// Helper binary.
    pub program: String,
    /// Helper arguments.
    pub args: Vec<String>,
    /// Maximum wait for the helper's ready line.
    pub startup_timeout: Duration,
    /// Maximum wait for any single response.
    pub request_timeout: Duration,
    /// Pre-authentication location handed to `session/establish`.
    pub login_url: String,
}

/// Decoded helper response line.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HelperResponse {
    /// Correlation id of the request being answered.
    pub id: String,
    /// Successful result payload.
    #[serde(default)]
    pub result: Option<Value>,
    /// Failure description.
    #[serde(default)]
    pub error: Option<HelperError>,
}

/// Error object inside a helper response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HelperError {
    /// Human-readable failure message.
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct LocationResult {
    location: String,
}

/// Parse one line of helper output.
///
/// Returns `Ok(None)` for blank lines and for messages without an `id`
/// (helper log output and notifications).
///
/// # Errors
///
/// Returns `AppError::Protocol` if the line is not valid JSON or the `id`
/// field is malformed.
pub fn parse_response_line(line: &str) -> Result<Option<HelperResponse>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(line)
        .map_err(|err| AppError::Protocol(format!("malformed json: {err}")))?;
    if value.get("id").is_none() {
        debug!(line, "helper: skipping message without id");
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|err| AppError::Protocol(format!("malformed response: {err}")))
}

struct HelperIo {
    child: Child,
    writer: FramedWrite<ChildStdin, HelperCodec>,
    reader: FramedRead<ChildStdout, HelperCodec>,
    closed: bool,
}

/// [`SessionDriver`] implemented by a spawned helper process.
pub struct HelperSession {
    io: Mutex<HelperIo>,
    next_id: AtomicU64,
    login_url: String,
    request_timeout: Duration,
}

impl HelperSession {
    /// Spawn the helper and wait for its ready line.
    ///
    /// # Errors
    ///
    /// - `AppError::Session("failed to spawn helper: …")` on OS spawn failure.
    /// - `AppError::Session("startup timeout …")` if no ready line arrives in time.
    /// - `AppError::Session("helper exited before ready signal")` on early EOF.
    pub async fn spawn(config: &HelperConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args);

        cmd.env_clear();
        for &key in ALLOWED_ENV_VARS {
            if let Ok(val) = std::env::var(key) {
                cmd.env(key, val);
            }
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| AppError::Session(format!("failed to spawn helper: {err}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Session("failed to capture helper stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Session("failed to capture helper stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(
                async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(line, "helper stderr");
                    }
                }
                .instrument(info_span!("helper_stderr")),
            );
        }

        let mut reader = FramedRead::new(stdout, HelperCodec::new());
        match tokio::time::timeout(config.startup_timeout, reader.next()).await {
            Ok(Some(Ok(line))) => {
                info!(ready_line = line.trim(), "session helper ready");
            }
            Ok(Some(Err(err))) => {
                child.kill().await.ok();
                return Err(AppError::Session(format!(
                    "failed to read helper ready signal: {err}"
                )));
            }
            Ok(None) => {
                return Err(AppError::Session(
                    "helper exited before ready signal".into(),
                ));
            }
            Err(_elapsed) => {
                child.kill().await.ok();
                return Err(AppError::Session(format!(
                    "startup timeout: helper did not emit ready signal within {:?}",
                    config.startup_timeout
                )));
            }
        }

        Ok(Self {
            io: Mutex::new(HelperIo {
                child,
                writer: FramedWrite::new(stdin, HelperCodec::new()),
                reader,
                closed: false,
            }),
            next_id: AtomicU64::new(1),
            login_url: config.login_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let mut io = self.io.lock().await;
        if io.closed {
            return Err(AppError::Session("helper session is closed".into()));
        }

        let request = json!({ "id": id, "method": method, "params": params });
        io.writer.send(request.to_string()).await?;

        let response =
            tokio::time::timeout(self.request_timeout, read_response(&mut io.reader, &id))
                .await
                .map_err(|_| {
                    AppError::Session(format!(
                        "{method} timed out after {:?}",
                        self.request_timeout
                    ))
                })??;

        match (response.result, response.error) {
            (_, Some(error)) => Err(AppError::Session(format!("{method}: {}", error.message))),
            (result, None) => Ok(result.unwrap_or(Value::Null)),
        }
    }

    async fn location_call(&self, method: &str, params: Value) -> Result<SessionLocation> {
        let result = self.call(method, params).await?;
        let parsed: LocationResult = serde_json::from_value(result)
            .map_err(|err| AppError::Protocol(format!("{method}: missing location: {err}")))?;
        Ok(SessionLocation::new(parsed.location))
    }
}

async fn read_response(
    reader: &mut FramedRead<ChildStdout, HelperCodec>,
    id: &str,
) -> Result<HelperResponse> {
    loop {
        let line = match reader.next().await {
            Some(line) => line?,
            None => return Err(AppError::Session("helper exited".into())),
        };
        match parse_response_line(&line) {
            Ok(Some(response)) if response.id == id => return Ok(response),
            Ok(Some(response)) => {
                debug!(expected = id, got = response.id, "helper: skipping stale response");
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "helper: skipping malformed line"),
        }
    }
}

impl SessionDriver for HelperSession {
    fn establish<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<SessionLocation>> + Send + 'a>> {
        Box::pin(async move {
            let params = json!({
                "loginUrl": self.login_url,
                "email": credentials.email,
                "password": credentials.password,
            });
            self.location_call("session/establish", params).await
        })
    }

    fn navigate_sub_task<'a>(
        &'a self,
        target: &'a SubTaskRef,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.call("session/navigate", json!({ "url": target.url }))
                .await
                .map(|_| ())
        })
    }

    fn current_location(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<SessionLocation>> + Send + '_>> {
        Box::pin(self.location_call("session/location", json!({})))
    }

    fn close_all(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.io.lock().await.closed {
                return Ok(());
            }
            let close_result = self.call("session/close", json!({})).await;

            let mut io = self.io.lock().await;
            io.closed = true;
            match tokio::time::timeout(CLOSE_GRACE, io.child.wait()).await {
                Ok(Ok(status)) => info!(?status, "session helper exited"),
                Ok(Err(err)) => warn!(%err, "error waiting for session helper"),
                Err(_) => {
                    warn!("session helper did not exit within grace period, forcing kill");
                    if let Err(err) = io.child.kill().await {
                        warn!(%err, "failed to force-kill session helper");
                    }
                }
            }
            close_result.map(|_| ())
        })
    }
}
