//! Broadcast dispatcher: one body, many recipients.
//!
//! A dispatch either rejects up front (session not live, nothing sent) or
//! attempts every recipient exactly once. Per-recipient failures are recorded
//! in the [`DispatchReport`] and never stop the remaining sends.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use herald_core::text::mask_recipient;

use crate::errors::{Result, SessionError};
use crate::manager::{SessionHandle, SessionManager};
use crate::metrics::{DISPATCH_DURATION_SECONDS, DISPATCH_REJECTED_TOTAL, DISPATCH_SENDS_TOTAL};

/// Pacing for a dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Pause between consecutive sends (sequential mode only).
    pub inter_send_delay: Option<Duration>,
    /// Maximum sends in flight. `1` sends strictly in order.
    pub max_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            inter_send_delay: None,
            max_concurrency: 1,
        }
    }
}

/// Per-call options for [`BroadcastDispatcher::broadcast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Tear the session down after a completed dispatch.
    pub teardown_after: bool,
}

/// Result of sending to one recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// Recipient as given by the caller.
    pub recipient: String,
    /// Whether the transport accepted the message.
    pub success: bool,
    /// Failure description when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    fn sent(recipient: &str) -> Self {
        Self {
            recipient: recipient.to_owned(),
            success: true,
            error: None,
        }
    }

    fn failed(recipient: &str, error: impl std::fmt::Display) -> Self {
        Self {
            recipient: recipient.to_owned(),
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// View as a result, mapping failure to [`SessionError::SendFailure`].
    pub fn into_result(self) -> Result<String> {
        match self.error {
            None if self.success => Ok(self.recipient),
            error => Err(SessionError::SendFailure {
                recipient: self.recipient,
                message: error.unwrap_or_default(),
            }),
        }
    }
}

/// Outcomes for every recipient, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// One entry per input recipient.
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    /// Number of successful sends.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Number of failed sends.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Whether every recipient was sent to.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    /// Iterate over the failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

impl Serialize for DispatchReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("DispatchReport", 3)?;
        s.serialize_field("sent", &self.succeeded())?;
        s.serialize_field("failed", &self.failed())?;
        s.serialize_field("outcomes", &self.outcomes)?;
        s.end()
    }
}

/// Sends rendered bodies through the manager's session.
#[derive(Clone, Debug)]
pub struct BroadcastDispatcher {
    manager: Arc<SessionManager>,
    config: DispatchConfig,
}

impl BroadcastDispatcher {
    /// Create a dispatcher over `manager`. A zero concurrency is treated as one.
    pub fn new(manager: Arc<SessionManager>, config: DispatchConfig) -> Self {
        let config = DispatchConfig {
            max_concurrency: config.max_concurrency.max(1),
            ..config
        };
        Self { manager, config }
    }

    /// The manager this dispatcher sends through.
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Send `body` to every recipient on an already-acquired session.
    ///
    /// Fails with [`SessionError::SessionNotReady`] before any send when the
    /// session is not live. Otherwise returns one outcome per recipient.
    #[instrument(skip_all, fields(recipients = recipients.len()))]
    pub async fn dispatch(
        &self,
        session: &SessionHandle,
        body: &str,
        recipients: &[String],
    ) -> Result<DispatchReport> {
        if !session.is_live() {
            counter!(DISPATCH_REJECTED_TOTAL).increment(1);
            warn!("dispatch rejected, session not ready");
            return Err(SessionError::SessionNotReady);
        }

        let started = Instant::now();
        let outcomes = if self.config.max_concurrency > 1 {
            // Futures are lazy; collecting them up front only keeps the
            // closure type out of the stream so the caller's future is `Send`.
            let sends: Vec<_> = recipients
                .iter()
                .map(|recipient| send_one(session, recipient, body))
                .collect();
            futures::stream::iter(sends)
                .buffered(self.config.max_concurrency)
                .collect::<Vec<_>>()
                .await
        } else {
            let mut outcomes = Vec::with_capacity(recipients.len());
            for (i, recipient) in recipients.iter().enumerate() {
                if i > 0 {
                    if let Some(delay) = self.config.inter_send_delay {
                        tokio::time::sleep(delay).await;
                    }
                }
                outcomes.push(send_one(session, recipient, body).await);
            }
            outcomes
        };

        let report = DispatchReport { outcomes };
        histogram!(DISPATCH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        info!(
            sent = report.succeeded(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dispatch complete"
        );
        Ok(report)
    }

    /// Acquire the session, dispatch, and optionally tear down afterwards.
    ///
    /// Teardown only follows a dispatch that ran; a rejected dispatch leaves
    /// the session in place so pairing can continue.
    #[instrument(skip_all, fields(recipients = recipients.len(), teardown_after = options.teardown_after))]
    pub async fn broadcast(
        &self,
        body: &str,
        recipients: &[String],
        options: DispatchOptions,
    ) -> Result<DispatchReport> {
        let session = self.manager.acquire().await?;
        let report = self.dispatch(&session, body, recipients).await?;

        if options.teardown_after {
            if let Err(e) = self.manager.teardown().await {
                warn!(error = %e, "teardown after dispatch failed");
            }
        }
        Ok(report)
    }
}

async fn send_one(session: &SessionHandle, recipient: &str, body: &str) -> DispatchOutcome {
    match session.transport().send_text(recipient, body).await {
        Ok(()) => {
            counter!(DISPATCH_SENDS_TOTAL, "result" => "ok").increment(1);
            debug!(recipient = %mask_recipient(recipient), "message sent");
            DispatchOutcome::sent(recipient)
        }
        Err(e) => {
            counter!(DISPATCH_SENDS_TOTAL, "result" => "error").increment(1);
            warn!(recipient = %mask_recipient(recipient), error = %e, "send failed");
            DispatchOutcome::failed(recipient, e)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
