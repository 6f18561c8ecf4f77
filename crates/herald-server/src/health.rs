//! `/health` endpoint.
//!
//! The gateway is `ok` unless the last session initialization failed, in
//! which case it reports `degraded` until a teardown clears the cached error.
//! An unpaired or never-started session is still healthy.

use std::time::Instant;

use herald_session::{SessionManager, SessionState};
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Lifecycle state of the chat session.
    pub session: SessionState,
    /// Whether a broadcast would be accepted right now.
    pub session_live: bool,
}

/// Snapshot the manager without blocking on an in-progress initialization.
pub fn health_check(start_time: Instant, manager: &SessionManager) -> HealthResponse {
    let session = manager.state();
    HealthResponse {
        status: if session == SessionState::Failed {
            "degraded"
        } else {
            "ok"
        },
        uptime_secs: start_time.elapsed().as_secs(),
        session,
        session_live: manager.is_live(),
    }
}
