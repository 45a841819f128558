use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A single metric source failed to produce samples for this cycle
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("none of the {attempted} slaves could be reached")]
    NoReachableSlaves { attempted: usize },

    #[error("source panicked: {0}")]
    Panicked(String),
}

impl SourceError {
    /// True for failures that are not transport or protocol problems
    pub fn is_unexpected(&self) -> bool {
        matches!(self, SourceError::Panicked(_))
    }
}

/// Delivery of a batch to the metric sink failed
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write batch to {addr}: {source}")]
    Write {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sending to {addr} timed out after {budget:?}")]
    TimedOut { addr: String, budget: Duration },

    #[error("sink panicked: {0}")]
    Panicked(String),
}

impl SinkError {
    pub fn is_unexpected(&self) -> bool {
        matches!(self, SinkError::Panicked(_))
    }
}

/// Startup configuration could not be resolved
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to load config file {path:?}: {reason}")]
    File { path: PathBuf, reason: String },
}

/// Render a panic payload caught by `catch_unwind`
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
