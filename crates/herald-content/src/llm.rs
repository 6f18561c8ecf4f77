//! # llm
//!
//! Chat-completions summarizer used to write news analysis and weather
//! reports. Handlers depend on [`Summarizer`] so tests can stub it.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{ContentError, Result};
use crate::http;

/// Production OpenAI host.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Turns a prompt into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Send `prompt` as a single user message and return the reply.
    async fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Connection settings for [`OpenAiClient`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Bearer key.
    pub api_key: String,
    /// Host, without the `/v1` path.
    pub base_url: String,
    /// Model id.
    pub model: String,
}

impl OpenAiConfig {
    /// Config against the production host with the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// `POST /v1/chat/completions` client.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client.
    pub fn new(mut config: OpenAiConfig) -> Self {
        config.base_url = http::base_url(&config.base_url);
        Self {
            client: http::client(),
            config,
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn summarize(&self, prompt: &str) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(ContentError::Provider {
                provider: "openai",
                message: "no API key configured".into(),
            });
        }

        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let request = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body);

        let response: ChatResponse = http::send_json("openai", request, |status, body| {
            match serde_json::from_str::<ErrorEnvelope>(body) {
                Ok(envelope) => ContentError::Api {
                    status,
                    message: envelope.error.message,
                    code: envelope.error.code,
                },
                Err(_) => ContentError::Api {
                    status,
                    message: herald_core::text::truncate_str(body, 200).to_owned(),
                    code: None,
                },
            }
        })
        .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ContentError::Provider {
                provider: "openai",
                message: "response contained no choices".into(),
            })?;
        debug!(reply_len = content.len(), "summary received");
        Ok(content)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
