//! # herald-server
//!
//! Axum HTTP gateway in front of the session manager and broadcast
//! dispatcher.
//!
//! - `/wa/status`, `/wa/logout`: session surface
//! - `/wa/messages`, `/wa/news`, `/wa/weathers`: render a body and broadcast it
//! - `/health`, `/metrics`: liveness and Prometheus text
//! - Graceful shutdown via [`ShutdownCoordinator`]: drain requests, then
//!   close the chat session
//!
//! Every response uses the `{error, message, data?}` envelope.

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;

pub use config::GatewayConfig;
pub use errors::{ApiError, Envelope};
pub use server::{AppState, GatewayServer, Services};
pub use shutdown::{DrainOutcome, ShutdownCoordinator};
