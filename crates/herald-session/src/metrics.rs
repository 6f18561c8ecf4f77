//! Metric names shared across Herald crates.

/// Session initializations (counter, labels: result).
pub const SESSION_INITIALIZATIONS_TOTAL: &str = "session_initializations_total";
/// Session teardowns (counter, labels: reason).
pub const SESSION_TEARDOWNS_TOTAL: &str = "session_teardowns_total";
/// Pairing events consumed (counter, labels: kind).
pub const PAIRING_EVENTS_TOTAL: &str = "pairing_events_total";
/// Individual sends (counter, labels: result).
pub const DISPATCH_SENDS_TOTAL: &str = "dispatch_sends_total";
/// Dispatches rejected before any send (counter).
pub const DISPATCH_REJECTED_TOTAL: &str = "dispatch_rejected_total";
/// Whole-dispatch duration (histogram).
pub const DISPATCH_DURATION_SECONDS: &str = "dispatch_duration_seconds";
/// Content provider requests (counter, labels: provider, result).
pub const PROVIDER_REQUESTS_TOTAL: &str = "provider_requests_total";
/// HTTP requests served (counter, labels: route, status).
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
