//! Gateway configuration.

use std::time::Duration;

use herald_settings::ServerSettings;

/// Configuration for [`GatewayServer`](crate::GatewayServer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Bound on session acquisition plus dispatch for each request.
    pub request_timeout: Duration,
    /// Most recipients one request may target.
    pub max_recipients: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout: Duration::from_secs(30),
            max_recipients: 100,
        }
    }
}

impl From<&ServerSettings> for GatewayConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            request_timeout: settings.request_timeout(),
            max_recipients: settings.max_recipients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.max_recipients, 100);
    }

    #[test]
    fn from_settings() {
        let settings = ServerSettings {
            host: "0.0.0.0".into(),
            port: 3000,
            request_timeout_secs: 5,
            max_recipients: 10,
        };
        let cfg = GatewayConfig::from(&settings);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_recipients, 10);
    }
}
