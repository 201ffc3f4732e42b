use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Maximum retry attempts after an initial request attempt.
pub const MAX_RETRIES: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 1000;

fn retryable_error_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)rate.?limit|overloaded|server.?error|service.?unavailable|upstream.?connect|connection.?(refused|reset)")
            .expect("retry regex must compile")
    })
}

/// Retry policy for transient statuses and transient-looking error text.
///
/// Authentication and quota failures are never retried.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    if matches!(status, 401 | 403) || is_quota_error(error_text) {
        return false;
    }
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504) || retryable_error_regex().is_match(error_text)
}

/// True when the error text reports an exhausted quota rather than a transient rate limit.
pub fn is_quota_error(error_text: &str) -> bool {
    error_text.contains("insufficient_quota") || error_text.contains("exceeded your current quota")
}

/// Compute exponential backoff delay for a retry attempt.
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(30);
    Duration::from_millis(BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(exponent)))
}
