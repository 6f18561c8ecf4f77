//! Contract for durable device identity.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device record the transport resumes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Local device identifier.
    pub device_id: String,
    /// Network identity assigned at pairing; `None` until paired.
    pub jid: Option<String>,
    /// Display name reported by the network.
    pub push_name: Option<String>,
}

impl DeviceIdentity {
    /// A fresh device that has never been paired.
    pub fn unpaired(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            jid: None,
            push_name: None,
        }
    }

    /// Whether the device has completed pairing.
    pub fn is_paired(&self) -> bool {
        self.jid.is_some()
    }
}

/// Failure reported by a [`SessionStore`] backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("session store error: {message}")]
pub struct IdentityStoreError {
    /// Backend failure description.
    pub message: String,
}

impl IdentityStoreError {
    /// Wrap any displayable backend error.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self {
            message: cause.to_string(),
        }
    }
}

/// Durable storage of device identity.
///
/// Implementations are synchronous; calls are short local queries.
pub trait SessionStore: Send + Sync {
    /// Whether a paired identity is stored.
    fn identity_exists(&self) -> Result<bool, IdentityStoreError>;

    /// Fetch the device record, creating an unpaired one when none exists.
    fn fetch_identity(&self) -> Result<DeviceIdentity, IdentityStoreError>;

    /// Persist the network identity assigned at pairing.
    fn record_pairing(&self, device_id: &str, jid: &str) -> Result<(), IdentityStoreError>;

    /// Forget the device after logout.
    fn clear_identity(&self, device_id: &str) -> Result<(), IdentityStoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
