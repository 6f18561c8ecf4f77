//! Session routes and plain-text broadcast.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use herald_session::{DispatchReport, StatusReport};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{bounded, check_recipients, send};
use crate::errors::{ApiError, Envelope};
use crate::server::AppState;

/// Body of `POST /wa/messages`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendMessagesRequest {
    /// Text to send.
    pub messages: String,
    /// Recipients, international format without `+`.
    pub whatsapp_numbers: Vec<String>,
    /// Tear the session down after sending.
    pub disconnect_after_send: bool,
}

/// `GET /wa/status`
///
/// Starts the session (and pairing) if needed, then reports status. Always
/// 200: initialization failures and timeouts report a disconnected session.
#[instrument(skip_all)]
pub async fn status(State(state): State<AppState>) -> Envelope<StatusReport> {
    let manager = state.dispatcher.manager();
    let acquired = bounded(state.config.request_timeout, async {
        manager
            .acquire()
            .await
            .map_err(|e| ApiError::from_session("Failed to initiate WhatsApp", &e))
    })
    .await;
    if let Err(e) = acquired {
        debug!(error = %e, "status requested without a usable session");
    }
    Envelope::with_data("WhatsApp Status", manager.status())
}

/// `POST /wa/logout`
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<Envelope, ApiError> {
    let manager = state.dispatcher.manager();
    bounded(state.config.request_timeout, async {
        let _ = manager
            .acquire()
            .await
            .map_err(|e| ApiError::from_session("Failed to initiate WhatsApp", &e))?;
        manager
            .logout()
            .await
            .map_err(|e| ApiError::from_session("Failed to logout WhatsApp", &e))
    })
    .await?;
    info!("logged out via gateway");
    Ok(Envelope::ok("Logout success"))
}

/// `POST /wa/messages`
#[instrument(skip_all)]
pub async fn send_messages(
    State(state): State<AppState>,
    payload: Result<Json<SendMessagesRequest>, JsonRejection>,
) -> Result<Envelope<DispatchReport>, ApiError> {
    let Json(req) = payload?;
    if req.messages.is_empty() {
        return Err(ApiError::bad_request("Messages is required"));
    }
    check_recipients(&req.whatsapp_numbers, state.config.max_recipients)?;

    let report = send(
        &state,
        &req.messages,
        &req.whatsapp_numbers,
        req.disconnect_after_send,
    )
    .await?;
    Ok(Envelope::with_data("Send Messages to Whatsapp", report))
}
