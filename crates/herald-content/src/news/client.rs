use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, instrument};

use super::types::{CATEGORIES, NewsResponse, TopHeadlinesRequest};
use crate::errors::{ContentError, Result};
use crate::http;

/// Production NewsAPI host.
pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// NewsAPI client.
#[derive(Clone, Debug)]
pub struct NewsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NewsClient {
    /// Create a client. An empty key disables requests.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: http::client(),
            base_url: http::base_url(base_url),
            api_key: api_key.into(),
        }
    }

    /// Fetch top headlines.
    ///
    /// Returns an empty response when no API key is configured. A body with
    /// `status != "ok"` is returned as-is; callers decide how to surface it.
    #[instrument(skip_all, fields(category = %req.category))]
    pub async fn top_headlines(&self, req: &TopHeadlinesRequest) -> Result<NewsResponse> {
        if self.api_key.is_empty() {
            debug!("no NewsAPI key configured");
            return Ok(NewsResponse::default());
        }

        let mut query = vec![
            ("pageSize", req.effective_page_size().to_string()),
            ("page", req.effective_page().to_string()),
        ];
        if !req.category.is_empty() {
            if !CATEGORIES.contains(&req.category.as_str()) {
                return Err(ContentError::invalid(format!(
                    "invalid category: {}. valid categories are {}",
                    req.category,
                    CATEGORIES.join(", ")
                )));
            }
            query.push(("category", req.category.clone()));
        }

        let request = self
            .client
            .get(format!("{}/v2/top-headlines", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "application/json")
            .query(&query);

        // NewsAPI reports errors in the same envelope as successes.
        http::send_json("newsapi", request, |status, body| {
            match serde_json::from_str::<NewsResponse>(body) {
                Ok(envelope) => ContentError::Api {
                    status,
                    message: envelope.message.unwrap_or_default(),
                    code: envelope.code,
                },
                Err(_) => ContentError::Api {
                    status,
                    message: herald_core::text::truncate_str(body, 200).to_owned(),
                    code: None,
                },
            }
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
