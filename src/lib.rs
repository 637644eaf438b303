#![forbid(unsafe_code)]

pub mod artifact;
pub mod config;
pub mod driver;
pub mod errors;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod persistence;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
