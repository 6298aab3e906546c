//! Error types for the pail-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors from credential resolution and the HTTP transport
#[derive(Error, Debug)]
pub enum CoreError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No usable credentials from any source
    #[error("no valid credentials found: {0}")]
    Credentials(String),

    /// Instance metadata service returned a non-success status
    #[error("metadata service returned status {status} for {path}")]
    Metadata { path: String, status: u16 },

    /// Instance metadata credential document did not parse
    #[error("malformed instance credentials: {0}")]
    MalformedCredentials(#[from] serde_json::Error),

    /// Request body cannot be buffered for another try
    #[error("request body cannot be replayed for retry")]
    UnreplayableBody,
}
