//! In-memory fakes for the session seams.
//!
//! Used by unit tests here and by integration tests in downstream crates.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::errors::TransportError;
use crate::store::{DeviceIdentity, IdentityStoreError, SessionStore};
use crate::transport::{PairingEvent, PairingEventStream, Transport, TransportConnector};

/// Behavior knobs for [`FakeTransport`].
#[derive(Clone, Debug, Default)]
pub struct FakeTransportConfig {
    /// Sleep inside `connect` before succeeding or failing.
    pub connect_delay: Option<Duration>,
    /// Make `connect` fail with this message.
    pub connect_error: Option<String>,
    /// Make `disconnect` fail with this message.
    pub disconnect_error: Option<String>,
    /// Sleep inside `logout` before succeeding or failing.
    pub logout_delay: Option<Duration>,
    /// Make `logout` fail with this message.
    pub logout_error: Option<String>,
    /// Recipients whose sends are rejected.
    pub failing_recipients: Vec<String>,
    /// Sleep inside each `send_text`.
    pub send_delay: Option<Duration>,
}

/// Scriptable [`Transport`] that records every call.
#[derive(Debug)]
pub struct FakeTransport {
    config: FakeTransportConfig,
    failing: HashSet<String>,
    connected: AtomicBool,
    identity: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    logouts: AtomicUsize,
    pairing_opens: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
    pairing_tx: Mutex<Option<mpsc::UnboundedSender<PairingEvent>>>,
}

impl FakeTransport {
    /// Build a transport for `device`; identity is present when it is paired.
    pub fn new(device: &DeviceIdentity, config: FakeTransportConfig) -> Self {
        Self {
            failing: config.failing_recipients.iter().cloned().collect(),
            config,
            connected: AtomicBool::new(false),
            identity: AtomicBool::new(device.is_paired()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
            pairing_opens: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            pairing_tx: Mutex::new(None),
        }
    }

    /// Push an event onto the pairing feed. `Success` also stores the identity.
    pub fn emit(&self, event: PairingEvent) {
        if matches!(event, PairingEvent::Success { .. }) {
            self.identity.store(true, Ordering::Release);
        }
        if let Some(tx) = self.pairing_tx.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Close the pairing feed.
    pub fn close_pairing(&self) {
        let _ = self.pairing_tx.lock().take();
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    /// Recipients accepted so far, in send order.
    pub fn sent_recipients(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(r, _)| r.clone()).collect()
    }

    /// Number of `connect` calls.
    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::Acquire)
    }

    /// Number of `disconnect` calls.
    pub fn disconnect_calls(&self) -> usize {
        self.disconnects.load(Ordering::Acquire)
    }

    /// Number of `logout` calls.
    pub fn logout_calls(&self) -> usize {
        self.logouts.load(Ordering::Acquire)
    }

    /// Number of pairing feeds opened.
    pub fn pairing_opens(&self) -> usize {
        self.pairing_opens.load(Ordering::Acquire)
    }

    /// Force the connection flag, simulating a network drop.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let _ = self.connects.fetch_add(1, Ordering::AcqRel);
        if let Some(delay) = self.config.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.config.connect_error {
            return Err(TransportError::Request {
                message: message.clone(),
            });
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let _ = self.disconnects.fetch_add(1, Ordering::AcqRel);
        self.connected.store(false, Ordering::Release);
        match &self.config.disconnect_error {
            Some(message) => Err(TransportError::Request {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn logout(&self) -> Result<(), TransportError> {
        let _ = self.logouts.fetch_add(1, Ordering::AcqRel);
        if let Some(delay) = self.config.logout_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Some(message) = &self.config.logout_error {
            return Err(TransportError::Rejected {
                status: 500,
                message: message.clone(),
            });
        }
        self.identity.store(false, Ordering::Release);
        Ok(())
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<(), TransportError> {
        if let Some(delay) = self.config.send_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if self.failing.contains(recipient) {
            return Err(TransportError::Rejected {
                status: 404,
                message: format!("{recipient} is not on the network"),
            });
        }
        self.sent.lock().push((recipient.to_owned(), body.to_owned()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn has_stored_identity(&self) -> bool {
        self.identity.load(Ordering::Acquire)
    }

    async fn pairing_events(&self) -> Result<PairingEventStream, TransportError> {
        let _ = self.pairing_opens.fetch_add(1, Ordering::AcqRel);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.pairing_tx.lock() = Some(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// [`TransportConnector`] that hands out [`FakeTransport`]s and keeps them
/// for inspection.
#[derive(Debug, Default)]
pub struct FakeConnector {
    config: FakeTransportConfig,
    open_error: Option<String>,
    opened: Mutex<Vec<Arc<FakeTransport>>>,
}

impl FakeConnector {
    /// Connector whose transports use `config`.
    pub fn new(config: FakeTransportConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Connector whose `open` always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of transports built.
    pub fn opened(&self) -> usize {
        self.opened.lock().len()
    }

    /// The most recently built transport.
    pub fn last(&self) -> Option<Arc<FakeTransport>> {
        self.opened.lock().last().cloned()
    }
}

#[async_trait]
impl TransportConnector for FakeConnector {
    async fn open(&self, device: &DeviceIdentity) -> Result<Arc<dyn Transport>, TransportError> {
        if let Some(message) = &self.open_error {
            return Err(TransportError::Request {
                message: message.clone(),
            });
        }
        let transport = Arc::new(FakeTransport::new(device, self.config.clone()));
        self.opened.lock().push(transport.clone());
        Ok(transport)
    }
}

/// [`SessionStore`] backed by a single in-memory device record.
#[derive(Debug)]
pub struct MemorySessionStore {
    device: Mutex<DeviceIdentity>,
    failure: Option<String>,
}

impl MemorySessionStore {
    /// Store holding a device that has never paired.
    pub fn unpaired(device_id: &str) -> Self {
        Self {
            device: Mutex::new(DeviceIdentity::unpaired(device_id)),
            failure: None,
        }
    }

    /// Store holding a paired device.
    pub fn paired(device_id: &str, jid: &str) -> Self {
        Self {
            device: Mutex::new(DeviceIdentity {
                jid: Some(jid.to_owned()),
                ..DeviceIdentity::unpaired(device_id)
            }),
            failure: None,
        }
    }

    /// Store where every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            device: Mutex::new(DeviceIdentity::unpaired("unused")),
            failure: Some(message.to_owned()),
        }
    }

    fn check(&self) -> Result<(), IdentityStoreError> {
        match &self.failure {
            Some(message) => Err(IdentityStoreError::new(message)),
            None => Ok(()),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn identity_exists(&self) -> Result<bool, IdentityStoreError> {
        self.check()?;
        Ok(self.device.lock().is_paired())
    }

    fn fetch_identity(&self) -> Result<DeviceIdentity, IdentityStoreError> {
        self.check()?;
        Ok(self.device.lock().clone())
    }

    fn record_pairing(&self, device_id: &str, jid: &str) -> Result<(), IdentityStoreError> {
        self.check()?;
        let mut device = self.device.lock();
        if device.device_id == device_id {
            device.jid = Some(jid.to_owned());
        }
        Ok(())
    }

    fn clear_identity(&self, device_id: &str) -> Result<(), IdentityStoreError> {
        self.check()?;
        let mut device = self.device.lock();
        if device.device_id == device_id {
            device.jid = None;
            device.push_name = None;
        }
        Ok(())
    }
}

/// Poll `cond` until it holds, panicking after two seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
