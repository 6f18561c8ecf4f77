//! # herald-session
//!
//! Lifecycle of the single authenticated chat-network session and fan-out
//! of rendered messages to many recipients.
//!
//! - [`SessionManager`]: lazily creates one session per process, serializes
//!   initialization, consumes pairing events in the background, and supports
//!   logout and teardown
//! - [`BroadcastDispatcher`]: sends one body to each recipient and reports a
//!   per-recipient outcome; one failed send never blocks the rest
//! - [`Transport`] and [`SessionStore`]: the seams to the chat-network client
//!   and to durable device identity
//! - [`bridge`]: a [`Transport`] that talks to an HTTP chat-network bridge
//! - [`testing`]: in-memory fakes for tests in this and downstream crates

#![deny(unsafe_code)]

pub mod bridge;
pub mod dispatcher;
pub mod errors;
pub mod manager;
pub mod metrics;
mod pairing;
pub mod store;
pub mod testing;
pub mod transport;

pub use dispatcher::{
    BroadcastDispatcher, DispatchConfig, DispatchOptions, DispatchOutcome, DispatchReport,
};
pub use errors::{InitStage, Result, SessionError, TransportError};
pub use manager::{PairingStatus, SessionHandle, SessionManager, SessionState, StatusReport};
pub use store::{DeviceIdentity, IdentityStoreError, SessionStore};
pub use transport::{PairingEvent, PairingEventStream, Transport, TransportConnector};
