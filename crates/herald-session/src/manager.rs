//! Session manager: one lazily-created session per process.
//!
//! Two locks, never nested in the reverse order:
//!
//! - the **slot lock** (`tokio::sync::Mutex`) guards the create/reset decision
//!   and is held across the whole initialization, so concurrent acquirers
//!   wait and then observe the same handle or the same cached error;
//! - the **pairing lock** (`parking_lot::RwLock`, per handle) guards the
//!   pairing code, ready flag and phase, written only by the pairing consumer.
//!
//! A third lock (`parking_lot::RwLock`) publishes a view of the slot. It is
//! written only while the slot lock is held and never across an await. Status
//! reads go through the view, so they never wait behind a slow
//! initialization, logout or teardown.
//!
//! Initialization runs in its own task holding an owned slot guard. A caller
//! that gives up (boundary timeout) does not abandon a half-built transport:
//! the task still finishes and records its result. A panic inside the task is
//! caught and recorded as a failure before the guard is released.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::FutureExt;
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::errors::{InitStage, Result, SessionError};
use crate::metrics::{SESSION_INITIALIZATIONS_TOTAL, SESSION_TEARDOWNS_TOTAL};
use crate::pairing::{self, PairingState, Phase};
use crate::store::{DeviceIdentity, SessionStore};
use crate::transport::{Transport, TransportConnector};

/// Observable lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session; the next acquire initializes.
    Uninitialized,
    /// An acquire is building the session.
    Initializing,
    /// Connected, waiting for the user to pair.
    PairingPending,
    /// Connected with a paired identity.
    Connected,
    /// Logged out; the next acquire starts from scratch.
    LoggedOut,
    /// Initialization failed; the error is cached until teardown.
    Failed,
}

/// Pairing code and ready flag, read together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairingStatus {
    /// Current pairing code, empty when not pairing.
    pub code: String,
    /// Whether `code` is ready to present.
    pub ready: bool,
}

/// Status surface exposed to callers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Whether the session is live.
    pub is_connected: bool,
    /// Whether a pairing code is ready to present.
    pub is_pairing_ready: bool,
    /// The pairing code, empty when none.
    pub pairing_code: String,
}

/// A built session: transport plus pairing state.
pub struct SessionHandle {
    generation: u64,
    device: DeviceIdentity,
    transport: Arc<dyn Transport>,
    pairing: Arc<RwLock<PairingState>>,
    closed: AtomicBool,
    consumer: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    /// Build counter, incremented on every (re)initialization.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Device the transport is bound to.
    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Code and ready flag from the same update.
    pub fn pairing_status(&self) -> PairingStatus {
        let guard = self.pairing.read();
        PairingStatus {
            code: guard.code.clone(),
            ready: guard.ready,
        }
    }

    /// Connected, paired, and not torn down.
    pub fn is_live(&self) -> bool {
        let _guard = self.pairing.read();
        !self.closed.load(Ordering::Acquire)
            && self.transport.is_connected()
            && self.transport.has_stored_identity()
    }

    /// Status surface for this handle.
    pub fn status(&self) -> StatusReport {
        let pairing = self.pairing_status();
        StatusReport {
            is_connected: self.is_live(),
            is_pairing_ready: pairing.ready,
            pairing_code: pairing.code,
        }
    }

    fn state(&self) -> SessionState {
        if self.closed.load(Ordering::Acquire) {
            return SessionState::Uninitialized;
        }
        match self.pairing.read().phase {
            Phase::PairingPending => SessionState::PairingPending,
            Phase::Connected => SessionState::Connected,
        }
    }

    /// Mark the handle dead and stop its pairing consumer.
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(task) = self.consumer.lock().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("generation", &self.generation)
            .field("device_id", &self.device.device_id)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

enum Slot {
    Empty,
    Ready(Arc<SessionHandle>),
    Failed(SessionError),
    LoggedOut,
}

/// Copy of the slot readable without the slot lock, plus the in-flight marker.
enum View {
    Empty,
    Initializing,
    Ready(Arc<SessionHandle>),
    Failed,
    LoggedOut,
}

impl View {
    fn of(slot: &Slot) -> Self {
        match slot {
            Slot::Empty => Self::Empty,
            Slot::Ready(handle) => Self::Ready(handle.clone()),
            Slot::Failed(_) => Self::Failed,
            Slot::LoggedOut => Self::LoggedOut,
        }
    }
}

/// Owns the single session for the process.
///
/// Held by the composition root and shared by reference (`Arc`).
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    connector: Arc<dyn TransportConnector>,
    slot: Arc<Mutex<Slot>>,
    view: Arc<RwLock<View>>,
    generation: Arc<AtomicU64>,
}

impl SessionManager {
    /// Create a manager. Nothing connects until the first [`acquire`](Self::acquire).
    pub fn new(store: Arc<dyn SessionStore>, connector: Arc<dyn TransportConnector>) -> Self {
        Self {
            store,
            connector,
            slot: Arc::new(Mutex::new(Slot::Empty)),
            view: Arc::new(RwLock::new(View::Empty)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the session, creating it on first use.
    ///
    /// Concurrent callers during initialization all observe the single
    /// attempt's outcome. A failure is cached until [`teardown`](Self::teardown).
    #[instrument(skip_all)]
    pub async fn acquire(&self) -> Result<Arc<SessionHandle>> {
        let slot = self.slot.clone().lock_owned().await;
        match &*slot {
            Slot::Ready(handle) => return Ok(handle.clone()),
            Slot::Failed(err) => return Err(err.clone()),
            Slot::Empty | Slot::LoggedOut => {}
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.view.write() = View::Initializing;
        let task = tokio::spawn(initialize_into(
            slot,
            self.view.clone(),
            self.store.clone(),
            self.connector.clone(),
            generation,
        ));

        match task.await {
            Ok(result) => result,
            Err(join_err) => {
                // Cancelled with the runtime. Another acquirer may already
                // have re-run initialization; its outcome stands.
                let mut slot = self.slot.lock().await;
                match &*slot {
                    Slot::Ready(handle) => return Ok(handle.clone()),
                    Slot::Failed(err) => return Err(err.clone()),
                    Slot::Empty | Slot::LoggedOut => {}
                }
                let err = SessionError::initialization(InitStage::Aborted, join_err);
                *slot = Slot::Failed(err.clone());
                *self.view.write() = View::Failed;
                Err(err)
            }
        }
    }

    /// Current lifecycle state. Never waits on the slot lock.
    pub fn state(&self) -> SessionState {
        match &*self.view.read() {
            View::Empty => SessionState::Uninitialized,
            View::Initializing => SessionState::Initializing,
            View::Ready(handle) => handle.state(),
            View::Failed => SessionState::Failed,
            View::LoggedOut => SessionState::LoggedOut,
        }
    }

    /// The current handle, if one is built.
    pub fn current(&self) -> Option<Arc<SessionHandle>> {
        match &*self.view.read() {
            View::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Pairing code and ready flag; empty when no session exists.
    pub fn pairing_status(&self) -> PairingStatus {
        self.current()
            .map(|h| h.pairing_status())
            .unwrap_or_default()
    }

    /// Transport present, connected, and holding a stored identity.
    pub fn is_live(&self) -> bool {
        self.current().is_some_and(|h| h.is_live())
    }

    /// Status surface. Always succeeds; absent or failed sessions report
    /// disconnected with no pairing code.
    pub fn status(&self) -> StatusReport {
        self.current().map(|h| h.status()).unwrap_or_default()
    }

    /// Log the device out, disconnect, and reset so the next acquire re-pairs.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let handle = match &*slot {
            Slot::Ready(handle) if handle.is_live() => handle.clone(),
            _ => return Err(SessionError::NotConnected),
        };

        handle
            .transport
            .logout()
            .await
            .map_err(|e| SessionError::Logout {
                message: e.to_string(),
            })?;

        handle.close();
        if let Err(e) = handle.transport.disconnect().await {
            warn!(error = %e, "disconnect after logout failed");
        }
        if let Err(e) = self.store.clear_identity(&handle.device.device_id) {
            warn!(device_id = %handle.device.device_id, error = %e, "failed to clear stored identity");
        }

        *slot = Slot::LoggedOut;
        *self.view.write() = View::LoggedOut;
        counter!(SESSION_TEARDOWNS_TOTAL, "reason" => "logout").increment(1);
        info!(generation = handle.generation, "logged out");
        Ok(())
    }

    /// Disconnect (best effort) and clear the session, including any cached
    /// initialization error.
    ///
    /// Returns [`SessionError::NotInitialized`] when no session was built;
    /// the slot is still reset.
    #[instrument(skip_all)]
    pub async fn teardown(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let previous = std::mem::replace(&mut *slot, Slot::Empty);
        *self.view.write() = View::Empty;

        let Slot::Ready(handle) = previous else {
            return Err(SessionError::NotInitialized);
        };

        handle.close();
        if let Err(e) = handle.transport.disconnect().await {
            warn!(error = %e, "disconnect during teardown failed");
        }
        counter!(SESSION_TEARDOWNS_TOTAL, "reason" => "teardown").increment(1);
        info!(generation = handle.generation, "session torn down");
        Ok(())
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Build a handle and record the outcome in the slot.
async fn initialize_into(
    mut slot: OwnedMutexGuard<Slot>,
    view: Arc<RwLock<View>>,
    store: Arc<dyn SessionStore>,
    connector: Arc<dyn TransportConnector>,
    generation: u64,
) -> Result<Arc<SessionHandle>> {
    let outcome = AssertUnwindSafe(initialize(store, connector, generation))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(SessionError::initialization(
                InitStage::Aborted,
                panic_message(panic.as_ref()),
            ))
        });

    let result = match outcome {
        Ok(handle) => {
            counter!(SESSION_INITIALIZATIONS_TOTAL, "result" => "ok").increment(1);
            *slot = Slot::Ready(handle.clone());
            Ok(handle)
        }
        Err(err) => {
            counter!(SESSION_INITIALIZATIONS_TOTAL, "result" => "error").increment(1);
            warn!(generation, error = %err, "session initialization failed");
            *slot = Slot::Failed(err.clone());
            Err(err)
        }
    };
    *view.write() = View::of(&slot);
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("initialization panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("initialization panicked: {s}")
    } else {
        "initialization panicked".to_owned()
    }
}

async fn initialize(
    store: Arc<dyn SessionStore>,
    connector: Arc<dyn TransportConnector>,
    generation: u64,
) -> Result<Arc<SessionHandle>> {
    let device = store
        .fetch_identity()
        .map_err(|e| SessionError::initialization(InitStage::Store, e))?;
    let resume = store
        .identity_exists()
        .map_err(|e| SessionError::initialization(InitStage::Store, e))?;

    let transport = connector
        .open(&device)
        .await
        .map_err(|e| SessionError::initialization(InitStage::Transport, e))?;

    let pairing = Arc::new(RwLock::new(PairingState::default()));

    let consumer = if resume {
        transport
            .connect()
            .await
            .map_err(|e| SessionError::initialization(InitStage::Connect, e))?;
        pairing.write().phase = Phase::Connected;
        info!(generation, device_id = %device.device_id, "connected with stored identity");
        None
    } else {
        let events = transport
            .pairing_events()
            .await
            .map_err(|e| SessionError::initialization(InitStage::Pairing, e))?;
        transport
            .connect()
            .await
            .map_err(|e| SessionError::initialization(InitStage::Connect, e))?;
        info!(generation, device_id = %device.device_id, "connected, waiting for pairing");
        Some(pairing::spawn_consumer(
            events,
            pairing.clone(),
            store,
            device.device_id.clone(),
        ))
    };

    Ok(Arc::new(SessionHandle {
        generation,
        device,
        transport,
        pairing,
        closed: AtomicBool::new(false),
        consumer: parking_lot::Mutex::new(consumer),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::testing::{FakeConnector, FakeTransportConfig, MemorySessionStore, eventually};
    use crate::transport::PairingEvent;

    fn manager(store: MemorySessionStore, connector: FakeConnector) -> (SessionManager, Arc<FakeConnector>, Arc<MemorySessionStore>) {
        let store = Arc::new(store);
        let connector = Arc::new(connector);
        let manager = SessionManager::new(store.clone(), connector.clone());
        (manager, connector, store)
    }

    #[tokio::test]
    async fn fresh_manager_is_uninitialized_and_not_live() {
        let (manager, connector, _) =
            manager(MemorySessionStore::paired("dev-1", "111@s.net"), FakeConnector::default());
        assert_eq!(manager.state(), SessionState::Uninitialized);
        assert!(!manager.is_live());
        assert_eq!(manager.status(), StatusReport::default());
        assert_eq!(connector.opened(), 0);
    }

    #[tokio::test]
    async fn stored_identity_connects_directly() {
        let (manager, connector, _) =
            manager(MemorySessionStore::paired("dev-1", "111@s.net"), FakeConnector::default());

        let handle = manager.acquire().await.unwrap();

        assert!(handle.is_live());
        assert_eq!(manager.state(), SessionState::Connected);
        let transport = connector.last().unwrap();
        assert_eq!(transport.connect_calls(), 1);
        assert_eq!(transport.pairing_opens(), 0);
    }

    #[tokio::test]
    async fn acquire_returns_same_handle() {
        let (manager, connector, _) =
            manager(MemorySessionStore::paired("dev-1", "111@s.net"), FakeConnector::default());
        let a = manager.acquire().await.unwrap();
        let b = manager.acquire().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.opened(), 1);
    }

    #[tokio::test]
    async fn pairing_scenario() {
        let (manager, connector, store) =
            manager(MemorySessionStore::unpaired("dev-1"), FakeConnector::default());

        let handle = manager.acquire().await.unwrap();
        assert_eq!(manager.state(), SessionState::PairingPending);
        assert_eq!(handle.pairing_status(), PairingStatus::default());
        assert!(!manager.is_live());

        let transport = connector.last().unwrap();
        transport.emit(PairingEvent::Code {
            code: "ABCD-1234".into(),
        });
        eventually(|| handle.pairing_status().ready).await;
        assert_eq!(
            handle.pairing_status(),
            PairingStatus {
                code: "ABCD-1234".into(),
                ready: true,
            }
        );
        assert_eq!(manager.status().pairing_code, "ABCD-1234");

        transport.emit(PairingEvent::Success {
            jid: Some("628123@s.net".into()),
        });
        eventually(|| manager.state() == SessionState::Connected).await;
        assert!(!handle.pairing_status().ready);
        assert!(manager.is_live());
        assert!(store.identity_exists().unwrap());
    }

    #[tokio::test]
    async fn concurrent_acquires_connect_once() {
        let (manager, connector, _) = manager(
            MemorySessionStore::paired("dev-1", "111@s.net"),
            FakeConnector::new(FakeTransportConfig {
                connect_delay: Some(Duration::from_millis(50)),
                ..FakeTransportConfig::default()
            }),
        );
        let manager = Arc::new(manager);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let m = manager.clone();
                tokio::spawn(async move { m.acquire().await })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap().unwrap());
        }

        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.last().unwrap().connect_calls(), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }

    #[tokio::test]
    async fn concurrent_acquires_share_cached_error() {
        let (manager, connector, _) = manager(
            MemorySessionStore::paired("dev-1", "111@s.net"),
            FakeConnector::new(FakeTransportConfig {
                connect_delay: Some(Duration::from_millis(20)),
                connect_error: Some("connection refused".into()),
                ..FakeTransportConfig::default()
            }),
        );
        let manager = Arc::new(manager);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let m = manager.clone();
                tokio::spawn(async move { m.acquire().await })
            })
            .collect();

        let mut errors = Vec::new();
        for task in tasks {
            errors.push(task.await.unwrap().unwrap_err());
        }

        assert_eq!(connector.opened(), 1);
        assert_matches!(
            &errors[0],
            SessionError::Initialization {
                stage: InitStage::Connect,
                ..
            }
        );
        assert!(errors.iter().all(|e| e == &errors[0]));
        assert_eq!(manager.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn cached_error_persists_until_teardown() {
        let (manager, connector, _) = manager(
            MemorySessionStore::paired("dev-1", "111@s.net"),
            FakeConnector::new(FakeTransportConfig {
                connect_error: Some("boom".into()),
                ..FakeTransportConfig::default()
            }),
        );

        let first = manager.acquire().await.unwrap_err();
        let second = manager.acquire().await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(connector.opened(), 1);

        assert_eq!(manager.teardown().await, Err(SessionError::NotInitialized));
        assert_eq!(manager.state(), SessionState::Uninitialized);

        let _ = manager.acquire().await.unwrap_err();
        assert_eq!(connector.opened(), 2);
    }

    #[tokio::test]
    async fn store_failure_is_initialization_error() {
        let (manager, connector, _) =
            manager(MemorySessionStore::failing("disk full"), FakeConnector::default());
        let err = manager.acquire().await.unwrap_err();
        assert_matches!(
            err,
            SessionError::Initialization {
                stage: InitStage::Store,
                ..
            }
        );
        assert_eq!(connector.opened(), 0);
    }

    #[tokio::test]
    async fn connector_failure_is_initialization_error() {
        let (manager, _, _) = manager(
            MemorySessionStore::unpaired("dev-1"),
            FakeConnector::failing("bridge unreachable"),
        );
        let err = manager.acquire().await.unwrap_err();
        assert_matches!(
            err,
            SessionError::Initialization {
                stage: InitStage::Transport,
                ..
            }
        );
    }

    #[tokio::test]
    async fn logout_when_not_live_makes_no_transport_calls() {
        let (manager, connector, _) =
            manager(MemorySessionStore::unpaired("dev-1"), FakeConnector::default());
        assert_eq!(manager.logout().await, Err(SessionError::NotConnected));
        assert_eq!(connector.opened(), 0);

        // Pairing pending: transport exists but no identity yet.
        let _ = manager.acquire().await.unwrap();
        assert_eq!(manager.logout().await, Err(SessionError::NotConnected));
        let transport = connector.last().unwrap();
        assert_eq!(transport.logout_calls(), 0);
        assert_eq!(transport.disconnect_calls(), 0);
    }

    #[tokio::test]
    async fn logout_resets_and_next_acquire_reinitializes() {
        let (manager, connector, store) =
            manager(MemorySessionStore::paired("dev-1", "111@s.net"), FakeConnector::default());

        let old = manager.acquire().await.unwrap();
        manager.logout().await.unwrap();

        let old_transport = connector.last().unwrap();
        assert_eq!(old_transport.logout_calls(), 1);
        assert_eq!(old_transport.disconnect_calls(), 1);
        assert_eq!(manager.state(), SessionState::LoggedOut);
        assert!(!old.is_live());
        assert!(!store.identity_exists().unwrap());

        let fresh = manager.acquire().await.unwrap();
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(fresh.generation() > old.generation());
        assert_eq!(connector.opened(), 2);
        // Identity was cleared, so the new session must pair again.
        assert_eq!(manager.state(), SessionState::PairingPending);
        assert_eq!(connector.last().unwrap().pairing_opens(), 1);
    }

    #[tokio::test]
    async fn logout_failure_keeps_session() {
        let (manager, _, _) = manager(
            MemorySessionStore::paired("dev-1", "111@s.net"),
            FakeConnector::new(FakeTransportConfig {
                logout_error: Some("server said no".into()),
                ..FakeTransportConfig::default()
            }),
        );
        let _ = manager.acquire().await.unwrap();
        let err = manager.logout().await.unwrap_err();
        assert_matches!(err, SessionError::Logout { .. });
        assert!(manager.is_live());
    }

    #[tokio::test]
    async fn teardown_disconnects_and_clears() {
        let (manager, connector, _) =
            manager(MemorySessionStore::paired("dev-1", "111@s.net"), FakeConnector::default());
        let handle = manager.acquire().await.unwrap();

        manager.teardown().await.unwrap();

        assert_eq!(connector.last().unwrap().disconnect_calls(), 1);
        assert!(!handle.is_live());
        assert_eq!(manager.state(), SessionState::Uninitialized);
        assert_eq!(manager.teardown().await, Err(SessionError::NotInitialized));
    }

    #[tokio::test]
    async fn teardown_tolerates_disconnect_failure() {
        let (manager, _, _) = manager(
            MemorySessionStore::paired("dev-1", "111@s.net"),
            FakeConnector::new(FakeTransportConfig {
                disconnect_error: Some("already closed".into()),
                ..FakeTransportConfig::default()
            }),
        );
        let _ = manager.acquire().await.unwrap();
        assert!(manager.teardown().await.is_ok());
        assert_eq!(manager.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn teardown_stops_pairing_consumer() {
        let (manager, connector, _) =
            manager(MemorySessionStore::unpaired("dev-1"), FakeConnector::default());
        let handle = manager.acquire().await.unwrap();
        manager.teardown().await.unwrap();

        connector.last().unwrap().emit(PairingEvent::Code {
            code: "LATE-0001".into(),
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            handle.pairing_status(),
            PairingStatus {
                code: "WXYZ-9876".into(),
                ready: true,
            }
        );
    }

    #[tokio::test]
    async fn status_reads_do_not_wait_for_initialization() {
        let (manager, _, _) = manager(
            MemorySessionStore::paired("dev-1", "111@s.net"),
            FakeConnector::new(FakeTransportConfig {
                connect_delay: Some(Duration::from_millis(200)),
                ..FakeTransportConfig::default()
            }),
        );
        let manager = Arc::new(manager);
        let m = manager.clone();
        let pending = tokio::spawn(async move { m.acquire().await });

        eventually(|| manager.state() == SessionState::Initializing).await;
        let status = tokio::time::timeout(Duration::from_millis(20), async { manager.status() })
            .await
            .unwrap();
        assert!(!status.is_connected);

        let _ = pending.await.unwrap().unwrap();
        assert!(manager.status().is_connected);
    }

    /// Panics on its first `open`, then behaves like [`FakeConnector`].
    struct PanicOnceConnector {
        opens: std::sync::atomic::AtomicUsize,
        inner: FakeConnector,
    }

    #[async_trait::async_trait]
    impl TransportConnector for PanicOnceConnector {
        async fn open(
            &self,
            device: &DeviceIdentity,
        ) -> std::result::Result<Arc<dyn Transport>, crate::errors::TransportError> {
            if self.opens.fetch_add(1, Ordering::AcqRel) == 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
                panic!("bridge client builder blew up");
            }
            self.inner.open(device).await
        }
    }

    #[tokio::test]
    async fn panicking_initialization_is_cached_for_every_waiter() {
        let connector = Arc::new(PanicOnceConnector {
            opens: std::sync::atomic::AtomicUsize::new(0),
            inner: FakeConnector::default(),
        });
        let manager = Arc::new(SessionManager::new(
            Arc::new(MemorySessionStore::paired("dev-1", "111@s.net")),
            connector.clone(),
        ));

        let first = {
            let m = manager.clone();
            tokio::spawn(async move { m.acquire().await })
        };
        eventually(|| manager.state() == SessionState::Initializing).await;
        let second = {
            let m = manager.clone();
            tokio::spawn(async move { m.acquire().await })
        };

        let a = first.await.unwrap().unwrap_err();
        let b = second.await.unwrap().unwrap_err();
        assert_matches!(
            &a,
            SessionError::Initialization {
                stage: InitStage::Aborted,
                message,
            } if message.contains("bridge client builder blew up")
        );
        assert_eq!(a, b);
        assert_eq!(connector.opens.load(Ordering::Acquire), 1);
        assert_eq!(connector.inner.opened(), 0);
        assert_eq!(manager.state(), SessionState::Failed);

        assert_eq!(manager.teardown().await, Err(SessionError::NotInitialized));
        let handle = manager.acquire().await.unwrap();
        assert!(handle.is_live());
        assert_eq!(connector.inner.opened(), 1);
    }

    #[tokio::test]
    async fn status_stays_connected_during_slow_logout() {
        let (manager, connector, _) = manager(
            MemorySessionStore::paired("dev-1", "111@s.net"),
            FakeConnector::new(FakeTransportConfig {
                logout_delay: Some(Duration::from_millis(200)),
                ..FakeTransportConfig::default()
            }),
        );
        let manager = Arc::new(manager);
        let _ = manager.acquire().await.unwrap();

        let m = manager.clone();
        let pending = tokio::spawn(async move { m.logout().await });
        let transport = connector.last().unwrap();
        eventually(|| transport.logout_calls() == 1).await;

        assert_eq!(manager.state(), SessionState::Connected);
        assert!(manager.current().is_some());
        assert!(manager.status().is_connected);

        pending.await.unwrap().unwrap();
        assert_eq!(manager.state(), SessionState::LoggedOut);
        assert!(manager.current().is_none());
    }

    #[tokio::test]
    async fn pairing_status_is_never_torn_under_concurrent_updates() {
        let (manager, _, _) = manager(MemorySessionStore::unpaired("dev-1"), FakeConnector::default());
        let handle = manager.acquire().await.unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                for i in 0..5_000 {
                    let event = match i % 3 {
                        0 => PairingEvent::Code { code: "ABCD-1234".into() },
                        1 => PairingEvent::Code { code: "WXYZ-9876".into() },
                        _ => PairingEvent::Timeout,
                    };
                    pairing::apply_event(&handle.pairing, &event);
                }
                done.store(true, Ordering::Release);
            });

            let readers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        while !done.load(Ordering::Acquire) {
                            let status = handle.pairing_status();
                            assert_eq!(status.ready, !status.code.is_empty(), "torn read: {status:?}");
                            let report = handle.status();
                            assert_eq!(report.is_pairing_ready, !report.pairing_code.is_empty());
                        }
                    })
                })
                .collect();

            writer.join().unwrap();
            for reader in readers {
                reader.join().unwrap();
            }
        });

        assert_eq!(
            handle.pairing_status(),
            PairingStatus {
                code: "WXYZ-9876".into(),
                ready: true,
            }
        );
    }
}
