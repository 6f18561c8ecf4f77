//! Error types for content providers.

use thiserror::Error;

/// Errors from provider clients and formatters.
#[derive(Debug, Error)]
pub enum ContentError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller-supplied parameters were rejected before any request.
    #[error("{message}")]
    InvalidRequest {
        /// Validation failure.
        message: String,
    },

    /// Provider answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error message.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
    },

    /// Provider answered 200 but reported failure in the body.
    #[error("{provider} reported an error: {message}")]
    Provider {
        /// Provider name.
        provider: &'static str,
        /// Provider error message.
        message: String,
    },
}

impl ContentError {
    /// Validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether the caller's input caused the failure.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}

/// Convenience type alias for content results.
pub type Result<T> = std::result::Result<T, ContentError>;
