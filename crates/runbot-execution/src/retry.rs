//! Retry policy shared by every outbound HTTP client in runbot.
//!
//! Both the execution client and the GitHub REST client classify failures and
//! compute delays through these helpers, so a throttled or flaky upstream is
//! handled the same way regardless of which service answered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

const MAX_RETRY_DELAY_MS: u64 = 30_000;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Throttling, conflicts and server errors.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429) || status >= 500
}

pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Reads `Retry-After` as delta seconds or an HTTP date. Past dates yield zero.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay_ms = retry_at.signed_duration_since(Utc::now()).num_milliseconds();
    Some(Duration::from_millis(u64::try_from(delay_ms).unwrap_or(0)))
}

/// Delay before retry number `retry` (1-based): `base_delay_ms` doubled per
/// retry, capped at 30 s, and never shorter than `retry_after`.
pub fn retry_delay(base_delay_ms: u64, retry: usize, retry_after: Option<Duration>) -> Duration {
    let shift = retry.saturating_sub(1).min(8) as u32;
    let backoff_ms = base_delay_ms
        .max(1)
        .saturating_mul(2_u64.saturating_pow(shift))
        .min(MAX_RETRY_DELAY_MS);
    let backoff = Duration::from_millis(backoff_ms);
    match retry_after {
        Some(retry_after) => backoff.max(retry_after),
        None => backoff,
    }
}

pub fn new_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let count = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("runbot-{millis}-{count}")
}
