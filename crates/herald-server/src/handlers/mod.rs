//! Route handlers.
//!
//! Session work (acquire, dispatch, logout) runs under the configured
//! boundary timeout. Provider calls carry their own HTTP timeouts and are
//! not counted against it.

pub mod news;
pub mod wa;
pub mod weather;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use herald_session::{DispatchOptions, DispatchReport};
use tracing::warn;

use crate::errors::ApiError;
use crate::server::AppState;

/// Run `fut`, failing with 504 once `timeout` elapses.
pub(crate) async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if let Ok(result) = tokio::time::timeout(timeout, fut).await {
        result
    } else {
        warn!(timeout_ms = timeout.as_millis() as u64, "request timed out");
        Err(ApiError::Timeout(format!(
            "Request timed out after {}s",
            timeout.as_secs_f64()
        )))
    }
}

/// Reject empty or oversized recipient lists.
pub(crate) fn check_recipients(numbers: &[String], max: usize) -> Result<(), ApiError> {
    if numbers.is_empty() {
        return Err(ApiError::bad_request("Whatsapp numbers is required"));
    }
    if numbers.len() > max {
        return Err(ApiError::bad_request(format!(
            "Max Whatsapp numbers is {max}"
        )));
    }
    Ok(())
}

/// Broadcast a rendered body under the boundary timeout.
pub(crate) async fn send(
    state: &AppState,
    body: &str,
    recipients: &[String],
    teardown_after: bool,
) -> Result<DispatchReport, ApiError> {
    let options = DispatchOptions { teardown_after };
    bounded(state.config.request_timeout, async {
        let fut: Pin<Box<dyn Future<Output = _> + Send + '_>> =
            Box::pin(state.dispatcher.broadcast(body, recipients, options));
        fut.await
            .map_err(|e| ApiError::from_session("Failed to send messages", &e))
    })
    .await
}
