//! # herald-core
//!
//! Foundation utilities shared by every Herald crate.
//!
//! - [`logging`]: `tracing` subscriber bootstrap and in-memory log capture for tests
//! - [`text`]: UTF-8 safe truncation for log previews

#![deny(unsafe_code)]

pub mod logging;
pub mod text;
