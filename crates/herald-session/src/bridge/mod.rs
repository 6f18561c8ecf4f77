//! # Bridge transport
//!
//! [`Transport`](crate::Transport) implementation that drives an external
//! chat-network bridge over HTTP. The bridge owns the wire protocol; this
//! client only issues session commands and follows the pairing feed.
//!
//! | Operation | Request |
//! |---|---|
//! | connect | `POST {base}/sessions/{device}/connect` |
//! | disconnect | `POST {base}/sessions/{device}/disconnect` |
//! | logout | `POST {base}/sessions/{device}/logout` |
//! | send | `POST {base}/sessions/{device}/messages` |
//! | pairing feed | `GET {base}/sessions/{device}/pairing` (SSE) |

mod client;
mod sse;

use std::time::Duration;

pub use client::{BridgeConnector, BridgeTransport};

/// Default per-request timeout for bridge commands.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection details for the bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Bearer token sent on every request, when set.
    pub token: Option<String>,
    /// Timeout for command requests. The pairing feed is not bounded.
    pub request_timeout: Duration,
}

impl BridgeConfig {
    /// Config for `base_url` with no token and the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Attach a bearer token. Empty tokens are ignored.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(
            BridgeConfig::new("http://bridge:8085/").base_url,
            "http://bridge:8085"
        );
    }

    #[test]
    fn empty_token_is_dropped() {
        let config = BridgeConfig::new("http://b").with_token(Some(String::new()));
        assert_eq!(config.token, None);
        let config = BridgeConfig::new("http://b").with_token(Some("t".into()));
        assert_eq!(config.token.as_deref(), Some("t"));
    }
}
