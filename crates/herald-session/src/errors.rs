//! Error types for session management and dispatch.
//!
//! [`SessionError`] is `Clone` because a failed initialization is cached and
//! handed verbatim to every caller until the session is torn down.

use std::fmt;

use thiserror::Error;

/// Where session initialization failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitStage {
    /// Loading the device identity from the session store.
    Store,
    /// Building the transport client for the device.
    Transport,
    /// Opening the pairing-event stream.
    Pairing,
    /// The initial connect call.
    Connect,
    /// The initialization task itself panicked or was cancelled.
    Aborted,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Store => "store",
            Self::Transport => "transport",
            Self::Pairing => "pairing",
            Self::Connect => "connect",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the session manager and the broadcast dispatcher.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// First-time setup failed. Cached until teardown.
    #[error("session initialization failed at {stage}: {message}")]
    Initialization {
        /// The step that failed.
        stage: InitStage,
        /// Underlying failure.
        message: String,
    },

    /// Logout attempted without a live session.
    #[error("session is not connected")]
    NotConnected,

    /// Dispatch attempted while the session is not live.
    #[error("session is not ready for dispatch")]
    SessionNotReady,

    /// Teardown attempted with no session present.
    #[error("session is not initialized")]
    NotInitialized,

    /// A single recipient's send failed. Never aborts a broadcast.
    #[error("failed to send to {recipient}: {message}")]
    SendFailure {
        /// Recipient identifier.
        recipient: String,
        /// Transport failure.
        message: String,
    },

    /// The transport refused the logout request.
    #[error("logout failed: {message}")]
    Logout {
        /// Transport failure.
        message: String,
    },
}

impl SessionError {
    /// Build an initialization error from any displayable cause.
    pub fn initialization(stage: InitStage, cause: impl fmt::Display) -> Self {
        Self::Initialization {
            stage,
            message: cause.to_string(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "INITIALIZATION_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::SessionNotReady => "SESSION_NOT_READY",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::SendFailure { .. } => "SEND_FAILURE",
            Self::Logout { .. } => "LOGOUT_FAILED",
        }
    }

    /// Whether the caller can retry after re-acquiring the session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Initialization { .. })
    }
}

/// Errors reported by a [`Transport`](crate::Transport) implementation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Operation requires a connected transport.
    #[error("transport is not connected")]
    NotConnected,

    /// The request never produced a response.
    #[error("transport request failed: {message}")]
    Request {
        /// Underlying I/O or protocol failure.
        message: String,
    },

    /// The remote side answered with an error status.
    #[error("transport rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP-style status code.
        status: u16,
        /// Error message from the remote side.
        message: String,
    },

    /// The pairing-event stream could not be opened.
    #[error("pairing stream unavailable: {message}")]
    PairingStream {
        /// Underlying failure.
        message: String,
    },
}

/// Convenience type alias for session results.
pub type Result<T> = std::result::Result<T, SessionError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
