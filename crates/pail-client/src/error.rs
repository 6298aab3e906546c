//! Client error types

use pail_core::CoreError;
use serde::Deserialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, S3Error>;

/// Client errors
#[derive(Error, Debug)]
pub enum S3Error {
    /// Bucket name or endpoint unusable for URL construction or signing.
    /// Never retried.
    #[error("addressing error: {0}")]
    Addressing(String),

    /// Network-level failure, surfaced once the transport's try budget
    /// is spent
    #[error("transport error: {0}")]
    Transport(#[from] CoreError),

    /// Structured error decoded from a non-success response
    #[error("S3 error ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// Malformed success-response payload. Never retried.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for S3Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(CoreError::Http(err))
    }
}

impl S3Error {
    /// Whether an attempt-sequence loop should try this call again.
    ///
    /// Protocol errors are transient only when their code is in the
    /// configured set; transport failures are always worth another
    /// signed attempt; addressing and decode failures never are.
    pub fn is_transient(&self, transient_codes: &[String]) -> bool {
        match self {
            Self::Api { code, .. } => transient_codes.iter().any(|transient| transient == code),
            Self::Transport(_) => true,
            Self::Addressing(_) | Self::Decode(_) => false,
        }
    }

    /// Decode a non-success response into a structured error.
    ///
    /// A body that fails to parse, or parses without a message, falls
    /// back to the HTTP status text; the numeric status is always kept.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let document: ErrorDocument = quick_xml::de::from_str(&body).unwrap_or_default();
        let code = if document.code.is_empty() {
            format!("HTTP{}", status.as_u16())
        } else {
            document.code
        };
        let message = if document.message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unrecognized status")
                .to_string()
        } else {
            document.message
        };

        Self::Api {
            status: status.as_u16(),
            code,
            message,
            request_id: document.request_id,
        }
    }
}

/// Error document returned in non-success response bodies
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDocument {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: Option<String>,
}
