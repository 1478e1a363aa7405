//! Errors returned by control-plane daemon calls.

use thiserror::Error;

/// Errors that can occur while talking to a control-plane daemon.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Daemon returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
