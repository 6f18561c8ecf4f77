//! # herald-store
//!
//! Durable device identity for the chat-network session, backed by `SQLite`.
//!
//! - [`connection`]: `r2d2` pool with per-connection pragmas
//! - [`migrations`]: embedded, versioned schema
//! - [`devices`]: stateless repository over the `devices` table
//! - [`SqliteSessionStore`]: the [`SessionStore`](herald_session::SessionStore)
//!   implementation used by the gateway

#![deny(unsafe_code)]

pub mod connection;
pub mod devices;
pub mod errors;
pub mod migrations;
mod store;

pub use connection::{ConnectionConfig, ConnectionPool};
pub use devices::{DeviceRepo, DeviceRow};
pub use errors::{Result, StoreError};
pub use store::SqliteSessionStore;
