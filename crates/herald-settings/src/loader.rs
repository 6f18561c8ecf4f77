//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HeraldSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use herald_core::logging::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::HeraldSettings;

/// Resolve the Herald home directory (`~/.herald`).
pub fn herald_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".herald")
}

/// Resolve the path to the settings file (`~/.herald/settings.json`).
pub fn settings_path() -> PathBuf {
    herald_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HeraldSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HeraldSettings> {
    let defaults = serde_json::to_value(HeraldSettings::default())
        .map_err(|source| SettingsError::parse(Path::new("<defaults>"), source))?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let user: Value =
            serde_json::from_str(&content).map_err(|source| SettingsError::parse(path, source))?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: HeraldSettings =
        serde_json::from_value(merged).map_err(|source| SettingsError::parse(path, source))?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning, keeping the file/default value.
pub fn apply_env_overrides(settings: &mut HeraldSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
fn apply_overrides(settings: &mut HeraldSettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = string("HERALD_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read(&lookup, "HERALD_PORT", |v| parse_u16_range(v, 1, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = read(&lookup, "HERALD_REQUEST_TIMEOUT_SECS", |v| {
        parse_u64_range(v, 1, 3600)
    }) {
        settings.server.request_timeout_secs = v;
    }
    if let Some(v) = read(&lookup, "HERALD_MAX_RECIPIENTS", |v| {
        parse_usize_range(v, 1, 10_000)
    }) {
        settings.server.max_recipients = v;
    }

    // ── Session ─────────────────────────────────────────────────────
    if let Some(v) = string("HERALD_SESSION_DB") {
        settings.session.db_path = v;
    }
    if let Some(v) = string("HERALD_BRIDGE_URL") {
        settings.session.bridge_url = v;
    }
    if let Some(v) = string("HERALD_BRIDGE_TOKEN") {
        settings.session.bridge_token = Some(v);
    }
    if let Some(v) = read(&lookup, "HERALD_INTER_SEND_DELAY_MS", |v| {
        parse_u64_range(v, 0, 60_000)
    }) {
        settings.session.inter_send_delay_ms = v;
    }
    if let Some(v) = read(&lookup, "HERALD_MAX_CONCURRENT_SENDS", |v| {
        parse_usize_range(v, 1, 64)
    }) {
        settings.session.max_concurrent_sends = v;
    }

    // ── Providers ───────────────────────────────────────────────────
    if let Some(v) = string("NEWSAPI_API_KEY") {
        settings.providers.news_api_key = Some(v);
    }
    if let Some(v) = string("OPENWEATHER_API_KEY") {
        settings.providers.open_weather_api_key = Some(v);
    }
    if let Some(v) = string("OPENAI_API_KEY") {
        settings.providers.open_ai_api_key = Some(v);
    }
    if let Some(v) = string("HERALD_OPENAI_MODEL") {
        settings.providers.open_ai_model = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("HERALD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read(&lookup, "HERALD_LOG_FORMAT", LogFormat::parse) {
        settings.logging.format = v;
    }
}

/// Read and parse one variable, warning when it is set but invalid.
fn read<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let val = lookup(name)?;
    let result = parse(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
