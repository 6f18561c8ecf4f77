//! Shared request plumbing for provider clients.

use std::time::Duration;

use metrics::counter;
use serde::de::DeserializeOwned;

use herald_session::metrics::PROVIDER_REQUESTS_TOTAL;

use crate::errors::{ContentError, Result};

/// Default timeout for provider requests.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared reqwest client.
pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Send `request`, count it, and decode a 2xx JSON body.
///
/// Non-2xx responses go through `on_error` with the status and raw body.
pub(crate) async fn send_json<T, F>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    on_error: F,
) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce(u16, &str) -> ContentError,
{
    let result = async {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(on_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
    .await;

    let label = if result.is_ok() { "ok" } else { "error" };
    counter!(PROVIDER_REQUESTS_TOTAL, "provider" => provider, "result" => label).increment(1);
    result
}

/// Trim a trailing slash from a configured base URL.
pub(crate) fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_owned()
}
