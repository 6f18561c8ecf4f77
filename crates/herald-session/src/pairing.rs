//! Background consumer of the pairing feed.
//!
//! The consumer is the only writer of the pairing state after
//! initialization. Code and ready flag are always written together under the
//! same write guard, so readers never see a code from one event paired with
//! the flag from another.

use std::sync::Arc;

use futures::StreamExt;
use metrics::counter;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics::PAIRING_EVENTS_TOTAL;
use crate::store::SessionStore;
use crate::transport::{PairingEvent, PairingEventStream};

/// Coarse phase of a live handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Waiting for the user to present a pairing code.
    #[default]
    PairingPending,
    /// Connected with a paired identity.
    Connected,
}

/// Fields guarded by the pairing lock.
#[derive(Clone, Debug, Default)]
pub(crate) struct PairingState {
    pub(crate) code: String,
    pub(crate) ready: bool,
    pub(crate) phase: Phase,
}

/// Apply one event to the shared state.
pub(crate) fn apply_event(state: &RwLock<PairingState>, event: &PairingEvent) {
    let mut guard = state.write();
    match event {
        PairingEvent::Code { code } => {
            guard.code.clone_from(code);
            guard.ready = true;
        }
        PairingEvent::Success { .. } => {
            guard.code.clear();
            guard.ready = false;
            guard.phase = Phase::Connected;
        }
        PairingEvent::Timeout | PairingEvent::Error { .. } => {
            guard.code.clear();
            guard.ready = false;
        }
    }
}

/// Spawn the consumer for one initialization attempt.
///
/// Never calls back into the session manager.
pub(crate) fn spawn_consumer(
    mut events: PairingEventStream,
    state: Arc<RwLock<PairingState>>,
    store: Arc<dyn SessionStore>,
    device_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            counter!(PAIRING_EVENTS_TOTAL, "kind" => event.kind()).increment(1);
            apply_event(&state, &event);

            match &event {
                PairingEvent::Code { .. } => info!(device_id = %device_id, "pairing code ready"),
                PairingEvent::Success { jid } => {
                    info!(device_id = %device_id, jid = ?jid, "pairing succeeded");
                    if let Some(jid) = jid {
                        if let Err(e) = store.record_pairing(&device_id, jid) {
                            warn!(device_id = %device_id, error = %e, "failed to persist pairing");
                        }
                    }
                }
                PairingEvent::Timeout => warn!(device_id = %device_id, "pairing code expired"),
                PairingEvent::Error { message } => {
                    warn!(device_id = %device_id, error = %message, "pairing feed reported an error");
                }
            }
        }
        debug!(device_id = %device_id, "pairing feed closed");
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
