//! `POST /wa/weathers`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::Local;
use herald_content::weather::{self, ReportType};
use herald_session::DispatchReport;
use serde::Deserialize;
use tracing::{info, instrument};

use super::{check_recipients, send};
use crate::errors::{ApiError, Envelope};
use crate::server::AppState;

/// Body of `POST /wa/weathers`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendWeatherRequest {
    /// `today` or `tomorrow`.
    #[serde(rename = "type")]
    pub report_type: String,
    /// Latitude, -90..=90.
    pub lat: f64,
    /// Longitude, -180..=180.
    pub lon: f64,
    /// Recipients, international format without `+`.
    pub whatsapp_numbers: Vec<String>,
    /// Have the LLM write the report instead of the fixed template.
    pub using_llm: bool,
    /// Tear the session down after sending.
    pub disconnect_after_send: bool,
}

/// Build a daily forecast and broadcast it.
#[instrument(skip_all)]
pub async fn send_weather(
    State(state): State<AppState>,
    payload: Result<Json<SendWeatherRequest>, JsonRejection>,
) -> Result<Envelope<DispatchReport>, ApiError> {
    let Json(req) = payload?;
    check_recipients(&req.whatsapp_numbers, state.config.max_recipients)?;
    let report_type: ReportType = req
        .report_type
        .parse()
        .map_err(|e: herald_content::ContentError| ApiError::bad_request(e.to_string()))?;
    if !(-90.0..=90.0).contains(&req.lat) {
        return Err(ApiError::bad_request("Latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&req.lon) {
        return Err(ApiError::bad_request(
            "Longitude must be between -180 and 180",
        ));
    }

    let data = state
        .weather
        .fetch_aggregate(report_type, req.lat, req.lon, Local::now().date_naive())
        .await
        .map_err(|e| {
            if e.is_invalid_request() {
                ApiError::bad_request(e.to_string())
            } else {
                ApiError::Internal(format!("Failed to get weather data: {e}"))
            }
        })?;

    let body = if req.using_llm {
        let report = state
            .summarizer
            .summarize(&weather::weather_prompt(&data))
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to get weather summary: {e}")))?;
        weather::format_llm(&report, &data)
    } else {
        weather::format_manual(&data)
    };
    info!(date = %data.date, llm = req.using_llm, "weather report rendered");

    let report = send(
        &state,
        &body,
        &req.whatsapp_numbers,
        req.disconnect_after_send,
    )
    .await?;
    Ok(Envelope::with_data("Send WeatherAPI to Whatsapp", report))
}
