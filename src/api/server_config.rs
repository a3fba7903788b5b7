//! HTTP server limits

use std::time::Duration;

/// Concurrent request limit
pub const MAX_CONCURRENCY: usize = 256;

/// Request body limit; summaries are small
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Floor for the per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Time left after the analyzer bound for recording and responding
pub const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

pub const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Request timeout that always outlasts the analyzer bound, so a slow
/// analyzer ends in the fallback path rather than a dropped request
pub fn request_timeout(analyzer_timeout: Duration) -> Duration {
    REQUEST_TIMEOUT.max(analyzer_timeout.saturating_add(REQUEST_TIMEOUT_HEADROOM))
}
