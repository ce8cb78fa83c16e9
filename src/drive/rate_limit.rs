//! Request pacing and retry helpers for the Drive API.
//!
//! Provides retry logic with exponential backoff and Retry-After header support.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Maximum retry attempts on rate limit errors.
const MAX_RETRIES: u32 = 5;

/// Maximum backoff delay (seconds).
const MAX_BACKOFF_SECS: u64 = 60;

/// Parse Retry-After header value (seconds or HTTP date).
/// Returns duration to wait, or None if header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;

    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs.min(MAX_BACKOFF_SECS)));
    }

    // HTTP dates are not used by the Drive API
    None
}

/// Calculate exponential backoff delay for a given attempt.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_SECS * 1000))
}

/// Whether a Drive error response asks the caller to slow down.
///
/// Drive reports quota errors either as 429 or as 403 with a
/// `rateLimitExceeded` / `userRateLimitExceeded` reason.
pub fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded")))
}

/// Rate limit state for tracking request timing.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    /// Name of the API (for logging).
    pub name: String,
    /// Minimum delay between consecutive requests.
    pub delay: Duration,
    last_request: Option<Instant>,
}

impl ApiRateLimiter {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            last_request: None,
        }
    }

    /// Wait for the configured delay since the last request.
    pub async fn wait_for_slot(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let wait = self.delay - elapsed;
                debug!("{}: waiting {:?} before next request", self.name, wait);
                sleep(wait).await;
            }
        }

        self.last_request = Some(Instant::now());
    }

    /// Handle a rate limit response, returning how long to wait.
    /// Returns None if max retries exceeded.
    pub fn handle_rate_limit(&self, attempt: u32, retry_after: Option<&str>) -> Option<Duration> {
        if attempt >= MAX_RETRIES {
            warn!("{}: max retries ({}) exceeded", self.name, MAX_RETRIES);
            return None;
        }

        let wait = if let Some(duration) = parse_retry_after(retry_after) {
            debug!("{}: rate limited, Retry-After: {:?}", self.name, duration);
            duration
        } else {
            let backoff = backoff_delay(attempt, 1000);
            debug!("{}: rate limited, backing off {:?}", self.name, backoff);
            backoff
        };

        Some(wait)
    }
}
