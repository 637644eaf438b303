//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Authentication never advanced past the entry location; aborts the run.
    SessionEstablishment(String),
    /// Session driver failure outside of establishment (navigation, close).
    Session(String),
    /// Capture source failure.
    Capture(String),
    /// Checkpoint store could not be reached at startup; aborts the run.
    CheckpointUnavailable(String),
    /// Checkpoint value rejected or checkpoint write failure.
    Checkpoint(String),
    /// Completion notification could not be published.
    Notify(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// HTTP transport failure.
    Http(String),
    /// Malformed message from an external helper process.
    Protocol(String),
    /// Operation invoked in a state that does not permit it.
    InvalidState(String),
    /// The run was aborted by an external signal.
    Cancelled,
}

impl AppError {
    /// Whether this error aborts the whole run rather than a single step.
    ///
    /// Session-driver (`Session`), notification and HTTP transport failures
    /// stay local to the step that hit them: they are logged and recording
    /// moves on. Everything else aborts, including a capture that cannot
    /// start and artifact I/O, with the checkpoint left at the chunk start.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Notify(_) | Self::Session(_) | Self::Http(_))
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::SessionEstablishment(msg) => write!(f, "session establishment: {msg}"),
            Self::Session(msg) => write!(f, "session: {msg}"),
            Self::Capture(msg) => write!(f, "capture: {msg}"),
            Self::CheckpointUnavailable(msg) => write!(f, "checkpoint store unavailable: {msg}"),
            Self::Checkpoint(msg) => write!(f, "checkpoint: {msg}"),
            Self::Notify(msg) => write!(f, "notify: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
