//! 💀 Every way a record or a batch can go sideways, by name.
//!
//! Only `ConfigError` is fatal. Everything else is caught at record or batch granularity,
//! logged, counted, and the pipeline keeps going. Like a postal service in a snowstorm.

use thiserror::Error;

/// 🔧 Startup-time problems. These abort initialization.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("💀 Unable to parse server URL [{url}]: {reason}")]
    InvalidServer { url: String, reason: String },
}

/// 📄 A record could not be turned into a document. The record is dropped.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unable to find field: {0}")]
    UnknownField(String),
    #[error("raw serialization failed: {0}")]
    Raw(#[from] serde_json::Error),
}

/// 🧩 A `%{...}` placeholder nobody could resolve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not interpolate field from config: {template}")]
pub struct InterpolationError {
    pub template: String,
}

/// 📡 A batch did not make it. The batch is considered lost.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("bulk post connection has timed out: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("error executing bulk request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("bulk response in error: {status}: {body}")]
    StoreResponse {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("bulk response reading in error: {0}")]
    Body(#[source] reqwest::Error),
}
