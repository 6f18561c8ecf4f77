use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::BridgeConfig;
use super::sse::parse_sse_lines;
use crate::errors::TransportError;
use crate::store::DeviceIdentity;
use crate::transport::{PairingEvent, PairingEventStream, Transport, TransportConnector};

/// Builds a [`BridgeTransport`] per device, sharing one HTTP client.
#[derive(Clone, Debug)]
pub struct BridgeConnector {
    config: BridgeConfig,
    client: reqwest::Client,
}

impl BridgeConnector {
    /// Create a connector for `config`.
    pub fn new(config: BridgeConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(request_error)?;
        info!(base_url = %config.base_url, "bridge connector initialized");
        Ok(Self { config, client })
    }
}

#[async_trait]
impl TransportConnector for BridgeConnector {
    async fn open(&self, device: &DeviceIdentity) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(BridgeTransport::new(
            self.client.clone(),
            &self.config,
            device,
        )))
    }
}

/// HTTP client for one device session on the bridge.
#[derive(Debug)]
pub struct BridgeTransport {
    client: reqwest::Client,
    config: BridgeConfig,
    device_id: String,
    connected: AtomicBool,
    identity: Arc<AtomicBool>,
}

#[derive(Serialize)]
struct SendTextRequest<'a> {
    recipient: &'a str,
    body: &'a str,
}

impl BridgeTransport {
    fn new(client: reqwest::Client, config: &BridgeConfig, device: &DeviceIdentity) -> Self {
        Self {
            client,
            config: config.clone(),
            device_id: device.device_id.clone(),
            connected: AtomicBool::new(false),
            identity: Arc::new(AtomicBool::new(device.is_paired())),
        }
    }

    fn url(&self, action: &str) -> String {
        format!(
            "{}/sessions/{}/{action}",
            self.config.base_url, self.device_id
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn command<B: Serialize + Sync>(
        &self,
        action: &str,
        body: Option<&B>,
    ) -> Result<(), TransportError> {
        let mut request = self
            .authorize(self.client.post(self.url(action)))
            .timeout(self.config.request_timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(request_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    fn require_connected(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.command::<()>("connect", None).await?;
        self.connected.store(true, Ordering::Release);
        debug!(device_id = %self.device_id, "bridge session connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::Release);
        self.command::<()>("disconnect", None).await
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.require_connected()?;
        self.command::<()>("logout", None).await?;
        self.identity.store(false, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<(), TransportError> {
        self.require_connected()?;
        self.command("messages", Some(&SendTextRequest { recipient, body }))
            .await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn has_stored_identity(&self) -> bool {
        self.identity.load(Ordering::Acquire)
    }

    async fn pairing_events(&self) -> Result<PairingEventStream, TransportError> {
        // Only the response head is bounded; the event body stays open.
        let request = self
            .authorize(self.client.get(self.url("pairing")))
            .header(ACCEPT, "text/event-stream")
            .send();
        let response = tokio::time::timeout(self.config.request_timeout, request)
            .await
            .map_err(|_| TransportError::PairingStream {
                message: format!(
                    "pairing feed did not respond within {:?}",
                    self.config.request_timeout
                ),
            })?
            .map_err(|e| TransportError::PairingStream {
                message: e.to_string(),
            })?;
        let response = ensure_success(response).await?;

        let identity = self.identity.clone();
        let events = parse_sse_lines(response.bytes_stream()).filter_map(move |data| {
            let identity = identity.clone();
            async move {
                match serde_json::from_str::<PairingEvent>(&data) {
                    Ok(event) => {
                        if matches!(event, PairingEvent::Success { .. }) {
                            identity.store(true, Ordering::Release);
                        }
                        Some(event)
                    }
                    Err(e) => {
                        warn!(error = %e, data = %herald_core::text::truncate_str(&data, 100), "unparseable pairing event");
                        None
                    }
                }
            }
        });
        Ok(Box::pin(events))
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    TransportError::Request {
        message: e.to_string(),
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(TransportError::Rejected {
        status: status.as_u16(),
        message,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn transport(server: &MockServer, device: DeviceIdentity) -> Arc<dyn Transport> {
        let config = BridgeConfig::new(server.uri()).with_token(Some("secret".into()));
        BridgeConnector::new(config)
            .unwrap()
            .open(&device)
            .await
            .unwrap()
    }

    async fn mount_ok(server: &MockServer, action: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/sessions/dev-1/{action}")))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn connect_sets_connected_flag() {
        let server = MockServer::start().await;
        mount_ok(&server, "connect").await;

        let t = transport(&server, DeviceIdentity::unpaired("dev-1")).await;
        assert!(!t.is_connected());
        t.connect().await.unwrap();
        assert!(t.is_connected());
        assert!(!t.has_stored_identity());
    }

    #[tokio::test]
    async fn identity_is_seeded_from_device() {
        let server = MockServer::start().await;
        let device = DeviceIdentity {
            jid: Some("111@s.net".into()),
            ..DeviceIdentity::unpaired("dev-1")
        };
        let t = transport(&server, device).await;
        assert!(t.has_stored_identity());
    }

    #[tokio::test]
    async fn send_posts_recipient_and_body() {
        let server = MockServer::start().await;
        mount_ok(&server, "connect").await;
        Mock::given(method("POST"))
            .and(path("/sessions/dev-1/messages"))
            .and(body_json(serde_json::json!({"recipient": "628123", "body": "hi"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(&server, DeviceIdentity::unpaired("dev-1")).await;
        t.connect().await.unwrap();
        t.send_text("628123", "hi").await.unwrap();
    }

    #[tokio::test]
    async fn send_requires_connection() {
        let server = MockServer::start().await;
        let t = transport(&server, DeviceIdentity::unpaired("dev-1")).await;
        assert_eq!(
            t.send_text("628123", "hi").await,
            Err(TransportError::NotConnected)
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_send_carries_status_and_message() {
        let server = MockServer::start().await;
        mount_ok(&server, "connect").await;
        Mock::given(method("POST"))
            .and(path("/sessions/dev-1/messages"))
            .respond_with(ResponseTemplate::new(404).set_body_string("recipient not on network"))
            .mount(&server)
            .await;

        let t = transport(&server, DeviceIdentity::unpaired("dev-1")).await;
        t.connect().await.unwrap();
        let err = t.send_text("000", "hi").await.unwrap_err();
        assert_matches!(
            err,
            TransportError::Rejected { status: 404, ref message } if message == "recipient not on network"
        );
    }

    #[tokio::test]
    async fn logout_clears_identity_and_connection() {
        let server = MockServer::start().await;
        mount_ok(&server, "connect").await;
        mount_ok(&server, "logout").await;
        let device = DeviceIdentity {
            jid: Some("111@s.net".into()),
            ..DeviceIdentity::unpaired("dev-1")
        };

        let t = transport(&server, device).await;
        t.connect().await.unwrap();
        t.logout().await.unwrap();
        assert!(!t.is_connected());
        assert!(!t.has_stored_identity());
    }

    #[tokio::test]
    async fn unreachable_bridge_is_request_error() {
        let config = BridgeConfig::new("http://127.0.0.1:1");
        let t = BridgeConnector::new(config)
            .unwrap()
            .open(&DeviceIdentity::unpaired("dev-1"))
            .await
            .unwrap();
        assert_matches!(t.connect().await, Err(TransportError::Request { .. }));
        assert!(!t.is_connected());
    }

    #[tokio::test]
    async fn pairing_feed_yields_events_and_sets_identity() {
        let server = MockServer::start().await;
        let body = concat!(
            ": hello\n\n",
            "data: {\"kind\":\"code\",\"code\":\"ABCD-1234\"}\n\n",
            "data: not-json\n\n",
            "data: {\"kind\":\"success\",\"jid\":\"628123@s.net\"}\n\n",
        );
        Mock::given(method("GET"))
            .and(path("/sessions/dev-1/pairing"))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let t = transport(&server, DeviceIdentity::unpaired("dev-1")).await;
        let events: Vec<PairingEvent> = t.pairing_events().await.unwrap().collect().await;

        assert_eq!(
            events,
            vec![
                PairingEvent::Code {
                    code: "ABCD-1234".into()
                },
                PairingEvent::Success {
                    jid: Some("628123@s.net".into())
                },
            ]
        );
        assert!(t.has_stored_identity());
    }

    #[tokio::test]
    async fn pairing_feed_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/dev-1/pairing"))
            .respond_with(ResponseTemplate::new(409).set_body_string("already paired"))
            .mount(&server)
            .await;

        let t = transport(&server, DeviceIdentity::unpaired("dev-1")).await;
        assert_matches!(
            t.pairing_events().await.err(),
            Some(TransportError::Rejected { status: 409, .. })
        );
    }
}
