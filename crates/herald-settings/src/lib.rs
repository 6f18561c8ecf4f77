//! # herald-settings
//!
//! Configuration with layered sources for the Herald gateway.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`HeraldSettings::default()`]
//! 2. **Settings file**: `~/.herald/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `HERALD_*` and provider key overrides (highest priority)
//!
//! The binary loads settings once and hands them to the composition root.
//! Nothing in the workspace reads settings from a global.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, herald_home, load_settings, load_settings_from_path, settings_path};
pub use types::*;
