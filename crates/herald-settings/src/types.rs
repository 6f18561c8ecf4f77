//! Settings types.
//!
//! Every struct uses `#[serde(default)]`, so a partial settings file only
//! needs the keys it overrides.

use std::time::Duration;

use herald_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeraldSettings {
    /// HTTP gateway settings.
    pub server: ServerSettings,
    /// Chat session and dispatch settings.
    pub session: SessionSettings,
    /// Content provider credentials and endpoints.
    pub providers: ProviderSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl HeraldSettings {
    /// Reject values that would make the gateway misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.session.max_concurrent_sends == 0 {
            return Err(SettingsError::InvalidValue(
                "session.maxConcurrentSends must be at least 1".into(),
            ));
        }
        if self.server.max_recipients == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxRecipients must be at least 1".into(),
            ));
        }
        if self.session.bridge_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "session.bridgeUrl must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP gateway settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Boundary timeout applied to session acquisition and dispatch, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum recipients accepted in a single request.
    pub max_recipients: usize,
}

impl ServerSettings {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 120,
            max_recipients: 100,
        }
    }
}

/// Chat session and broadcast settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Session store database path (relative paths resolve under `~/.herald`).
    pub db_path: String,
    /// Base URL of the chat-network bridge.
    pub bridge_url: String,
    /// Optional bearer token for the bridge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_token: Option<String>,
    /// Delay between consecutive sends in milliseconds (0 disables).
    pub inter_send_delay_ms: u64,
    /// Maximum in-flight sends per dispatch (1 keeps strict recipient order).
    pub max_concurrent_sends: usize,
}

impl SessionSettings {
    /// Inter-send delay, or `None` when disabled.
    pub fn inter_send_delay(&self) -> Option<Duration> {
        (self.inter_send_delay_ms > 0).then(|| Duration::from_millis(self.inter_send_delay_ms))
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            db_path: "session.db".to_string(),
            bridge_url: "http://127.0.0.1:8085".to_string(),
            bridge_token: None,
            inter_send_delay_ms: 0,
            max_concurrent_sends: 1,
        }
    }
}

/// Content provider credentials and endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// NewsAPI key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_api_key: Option<String>,
    /// NewsAPI base URL.
    pub news_base_url: String,
    /// OpenWeather key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_weather_api_key: Option<String>,
    /// OpenWeather base URL.
    pub open_weather_base_url: String,
    /// `OpenAI` key; LLM summaries are unavailable without it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_ai_api_key: Option<String>,
    /// `OpenAI` base URL.
    pub open_ai_base_url: String,
    /// Chat completion model.
    pub open_ai_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            news_api_key: None,
            news_base_url: "https://newsapi.org".to_string(),
            open_weather_api_key: None,
            open_weather_base_url: "https://api.openweathermap.org".to_string(),
            open_ai_api_key: None,
            open_ai_base_url: "https://api.openai.com".to_string(),
            open_ai_model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
