//! Contract for the chat-network client.
//!
//! The wire protocol lives behind [`Transport`]. A [`TransportConnector`]
//! builds one transport per device identity; the session manager owns the
//! resulting `Arc<dyn Transport>` until teardown.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::store::DeviceIdentity;

/// One event from the pairing feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PairingEvent {
    /// A fresh pairing code to present out-of-band.
    Code {
        /// The opaque code.
        code: String,
    },
    /// Pairing completed; the code is no longer needed.
    Success {
        /// Network identity assigned to this device, when the feed reports it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        jid: Option<String>,
    },
    /// The pairing window expired without a scan.
    Timeout,
    /// The feed reported a failure.
    Error {
        /// Failure description.
        message: String,
    },
}

impl PairingEvent {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Code { .. } => "code",
            Self::Success { .. } => "success",
            Self::Timeout => "timeout",
            Self::Error { .. } => "error",
        }
    }
}

/// One-directional pairing feed, consumed once per initialization attempt.
pub type PairingEventStream = Pin<Box<dyn Stream<Item = PairingEvent> + Send>>;

/// Chat-network client operations the session core depends on.
///
/// Implementations must be safe for concurrent `send_text` calls once
/// connected; the core adds no lock around individual sends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Deauthorize this device. Fails unless connected and paired.
    async fn logout(&self) -> Result<(), TransportError>;

    /// Send a plain-text message to one recipient.
    async fn send_text(&self, recipient: &str, body: &str) -> Result<(), TransportError>;

    /// Whether the connection is currently up.
    fn is_connected(&self) -> bool;

    /// Whether a paired identity is stored for this device.
    fn has_stored_identity(&self) -> bool;

    /// Open the pairing feed. Only called when no identity is stored.
    async fn pairing_events(&self) -> Result<PairingEventStream, TransportError>;
}

/// Builds a [`Transport`] bound to a device identity.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Create a transport for `device`. Must not connect yet.
    async fn open(&self, device: &DeviceIdentity) -> Result<Arc<dyn Transport>, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
