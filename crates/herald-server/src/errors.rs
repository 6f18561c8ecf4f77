//! Response envelopes and the handler error type.
//!
//! Every body has the shape `{"error": bool, "message": string}` with an
//! optional `data` field on success.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use herald_session::SessionError;

/// JSON envelope shared by every route.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope<T: Serialize = ()> {
    /// Whether the request failed.
    pub error: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Payload for routes that return one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl Envelope {
    /// Success with no payload.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Success with a payload.
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Handler failures, each mapped to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400: the caller sent something invalid.
    #[error("{0}")]
    BadRequest(String),
    /// 503: the session exists but cannot send yet.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// 504: the boundary timeout elapsed.
    #[error("{0}")]
    Timeout(String),
    /// 500: anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Map a session failure, prefixing the message with `context`.
    ///
    /// `SessionNotReady` is 503 and `NotConnected` is 400. Everything else,
    /// including a cached initialization failure, is 500.
    pub fn from_session(context: &str, err: &SessionError) -> Self {
        let message = format!("{context}: {err}");
        match err {
            SessionError::SessionNotReady => Self::ServiceUnavailable(message),
            SessionError::NotConnected => Self::BadRequest(message),
            _ => Self::Internal(message),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        Self::bad_request("Invalid request body")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        let body = Envelope::<()> {
            error: true,
            message: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
