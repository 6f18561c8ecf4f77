//! `POST /wa/news`

use std::future::Future;
use std::pin::Pin;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use herald_content::news::{self, NewsType, TopHeadlinesRequest};
use herald_session::DispatchReport;
use serde::Deserialize;
use tracing::{info, instrument};

use super::{check_recipients, send};
use crate::errors::{ApiError, Envelope};
use crate::server::AppState;

/// Body of `POST /wa/news`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendNewsRequest {
    /// Recipients, international format without `+`.
    pub whatsapp_numbers: Vec<String>,
    /// NewsAPI category.
    pub category: String,
    /// Append an LLM analysis of the headlines.
    pub using_llm: bool,
    /// Tear the session down after sending.
    pub disconnect_after_send: bool,
}

/// Fetch the top ten headlines for a category and broadcast the digest.
#[instrument(skip_all, fields(category))]
pub async fn send_news(
    State(state): State<AppState>,
    payload: Result<Json<SendNewsRequest>, JsonRejection>,
) -> Result<Envelope<DispatchReport>, ApiError> {
    let Json(req) = payload?;
    check_recipients(&req.whatsapp_numbers, state.config.max_recipients)?;
    if req.category.is_empty() {
        return Err(ApiError::bad_request("Category is required"));
    }
    let _ = tracing::Span::current().record("category", req.category.as_str());

    let news_type = if req.using_llm {
        let parsed = req
            .category
            .parse::<NewsType>()
            .map_err(|e| ApiError::bad_request(format!("Invalid category: {e}")))?;
        Some(parsed)
    } else {
        None
    };

    let headlines_req = TopHeadlinesRequest::top_ten(&req.category);
    let headlines: Pin<Box<dyn Future<Output = _> + Send + '_>> =
        Box::pin(state.news.top_headlines(&headlines_req));
    let resp = headlines
        .await
        .map_err(|e| {
            if e.is_invalid_request() {
                ApiError::bad_request(format!("Invalid category: {e}"))
            } else {
                ApiError::Internal(format!("Error Get News Data: {e}"))
            }
        })?;
    if !resp.is_ok() {
        return Err(ApiError::Internal(format!(
            "Failed to get news from newsapi: {}",
            resp.message.unwrap_or_default()
        )));
    }

    let summary = match news_type {
        Some(news_type) => {
            let digest = news::headline_digest(&req.category, &resp.articles);
            let prompt = news::summaries_prompt(&digest, news_type);
            let summary = state.summarizer.summarize(&prompt).await.map_err(|e| {
                ApiError::Internal(format!("Failed to get summaries from OpenAI: {e}"))
            })?;
            Some(summary)
        }
        None => None,
    };

    let body = news::format_headlines(&req.category, &resp.articles, summary.as_deref());
    info!(articles = resp.articles.len(), llm = req.using_llm, "news digest rendered");

    let report = send(
        &state,
        &body,
        &req.whatsapp_numbers,
        req.disconnect_after_send,
    )
    .await?;
    Ok(Envelope::with_data("News sent to WhatsApp successfully", report))
}
