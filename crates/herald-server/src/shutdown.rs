//! Stop sequence for the gateway.
//!
//! Cancelling the token stops the listener from accepting connections.
//! In-flight requests get the drain window to finish, after which the serve
//! task is aborted. The chat session is closed last so a request that is
//! mid-broadcast keeps its transport until it returns. Closing the session
//! gets its own drain window; a slot held by a stuck initialization is left
//! behind rather than blocking exit.

use std::time::Duration;

use herald_session::{SessionError, SessionManager};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long in-flight requests may run after shutdown is requested.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// What [`ShutdownCoordinator::drain`] managed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrainOutcome {
    /// The serve task finished inside the drain window.
    pub requests_drained: bool,
    /// A live session was torn down.
    pub session_closed: bool,
}

/// Owns the shutdown token shared by the listener and the binary.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    drain_timeout: Duration,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    /// Coordinator with [`DEFAULT_DRAIN_TIMEOUT`].
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Override the drain window.
    #[must_use]
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Token the listener waits on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request shutdown. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested");
            self.token.cancel();
        }
    }

    /// Whether shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger shutdown, wait for `serve` to finish, then close the session.
    pub async fn drain(&self, mut serve: JoinHandle<()>, manager: &SessionManager) -> DrainOutcome {
        self.trigger();

        let requests_drained = if tokio::time::timeout(self.drain_timeout, &mut serve)
            .await
            .is_ok()
        {
            true
        } else {
            warn!(
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "in-flight requests outlived the drain window, aborting listener"
            );
            serve.abort();
            false
        };

        let session_closed = match tokio::time::timeout(self.drain_timeout, manager.teardown()).await {
            Ok(Ok(())) => true,
            Ok(Err(SessionError::NotInitialized)) => {
                debug!("no session to close");
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "session teardown failed");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    "session teardown outlived the drain window, leaving it open"
                );
                false
            }
        };

        info!(requests_drained, session_closed, "shutdown complete");
        DrainOutcome {
            requests_drained,
            session_closed,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use herald_session::SessionState;
    use herald_session::testing::{
        FakeConnector, FakeTransportConfig, MemorySessionStore, eventually,
    };

    use super::*;

    fn manager(connector: Arc<FakeConnector>) -> SessionManager {
        SessionManager::new(
            Arc::new(MemorySessionStore::paired("dev-1", "628000@s.whatsapp.net")),
            connector,
        )
    }

    #[test]
    fn trigger_cancels_every_token_once() {
        let coord = ShutdownCoordinator::new();
        let (t1, t2) = (coord.token(), coord.token());
        assert!(!coord.is_triggered());
        coord.trigger();
        coord.trigger();
        assert!(coord.is_triggered());
        assert!(t1.is_cancelled() && t2.is_cancelled());
    }

    #[tokio::test]
    async fn drain_without_session() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let serve = tokio::spawn(async move { token.cancelled().await });
        let manager = manager(Arc::new(FakeConnector::new(FakeTransportConfig::default())));

        let outcome = coord.drain(serve, &manager).await;

        assert_eq!(
            outcome,
            DrainOutcome {
                requests_drained: true,
                session_closed: false
            }
        );
    }

    #[tokio::test]
    async fn drain_closes_live_session() {
        let connector = Arc::new(FakeConnector::new(FakeTransportConfig::default()));
        let manager = manager(connector.clone());
        let _ = manager.acquire().await.unwrap();
        assert!(manager.is_live());

        let coord = ShutdownCoordinator::new();
        let outcome = coord.drain(tokio::spawn(async {}), &manager).await;

        assert!(outcome.session_closed);
        assert_eq!(manager.state(), SessionState::Uninitialized);
        assert_eq!(connector.last().unwrap().disconnect_calls(), 1);
    }

    #[tokio::test]
    async fn drain_aborts_stuck_listener() {
        let coord = ShutdownCoordinator::new().with_drain_timeout(Duration::from_millis(50));
        let serve = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(300)).await;
        });
        let manager = manager(Arc::new(FakeConnector::new(FakeTransportConfig::default())));

        let outcome = coord.drain(serve, &manager).await;

        assert!(!outcome.requests_drained);
        assert!(coord.is_triggered());
    }

    #[tokio::test]
    async fn drain_gives_up_on_a_session_stuck_initializing() {
        let connector = Arc::new(FakeConnector::new(FakeTransportConfig {
            connect_delay: Some(Duration::from_secs(3600)),
            ..FakeTransportConfig::default()
        }));
        let manager = Arc::new(manager(connector));
        let m = manager.clone();
        let stuck = tokio::spawn(async move { m.acquire().await });
        eventually(|| manager.state() == SessionState::Initializing).await;

        let coord = ShutdownCoordinator::new().with_drain_timeout(Duration::from_millis(50));
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            coord.drain(tokio::spawn(async {}), &manager),
        )
        .await
        .expect("drain finishes while the slot is held");

        assert_eq!(
            outcome,
            DrainOutcome {
                requests_drained: true,
                session_closed: false
            }
        );
        stuck.abort();
    }
}
