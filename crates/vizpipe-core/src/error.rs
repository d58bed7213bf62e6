//! Error types for vizpipe.

use thiserror::Error;

/// Result type alias using vizpipe's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vizpipe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote service rejected the request (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Remote plot job failed or returned an unexpected response
    #[error("Plot job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation cancelled before completion
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
