//! Retry policy for provider calls.
//!
//! Retriable: transport failures (network/timeout), HTTP 5xx and 408, and
//! 429 (which additionally honors a server-indicated `Retry-After`). Other
//! 4xx statuses are permanent and returned immediately.

use std::time::{Duration, SystemTime};

use crate::error_handler::{AiLlmError, ProviderErrorKind};

/// Maximum attempts per completion call (1 initial + 2 retries).
pub const MAX_ATTEMPTS: usize = 3;

/// Base delay for exponential backoff.
pub const BASE_DELAY_MS: u64 = 1_000;

/// Cap for a single backoff sleep.
pub const MAX_DELAY_MS: u64 = 30_000;

/// Whether an HTTP status code should trigger a retry.
///
/// 429 is retryable but handled with `Retry-After` support by the caller.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Whether a gateway error is worth another attempt.
pub fn is_retryable(err: &AiLlmError) -> bool {
    match err {
        AiLlmError::HttpTransport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        AiLlmError::Provider(p) => match &p.kind {
            ProviderErrorKind::Timeout => true,
            ProviderErrorKind::HttpStatus(h) => is_retryable_status(h.status.as_u16()),
            _ => false,
        },
    }
}

/// Server-indicated reset delay, when the error carries one (429).
pub fn retry_after_secs(err: &AiLlmError) -> Option<u64> {
    match err {
        AiLlmError::Provider(p) => match &p.kind {
            ProviderErrorKind::HttpStatus(h) => h.retry_after_secs,
            _ => None,
        },
        _ => None,
    }
}

/// Parses a `Retry-After` header value: either delay-seconds or an HTTP date.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(secs);
    }
    if let Ok(date) = httpdate::parse_http_date(value) {
        let now = SystemTime::now();
        return Some(date.duration_since(now).map(|d| d.as_secs()).unwrap_or(0));
    }
    None
}

/// Exponential backoff delay for a 1-based attempt number.
pub fn backoff_delay(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    let delay_ms = BASE_DELAY_MS.saturating_mul(multiplier).min(MAX_DELAY_MS);
    Duration::from_millis(delay_ms)
}

/// Delay before the next attempt: `Retry-After` wins when present,
/// otherwise exponential backoff.
pub fn next_delay(err: &AiLlmError, attempt: usize) -> Duration {
    match retry_after_secs(err) {
        Some(secs) => Duration::from_secs(secs).min(Duration::from_millis(MAX_DELAY_MS)),
        None => backoff_delay(attempt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::llm_provider::LlmProvider;
    use crate::error_handler::{HttpError, ProviderError};
    use reqwest::StatusCode;

    fn status_err(status: StatusCode, retry_after_secs: Option<u64>) -> AiLlmError {
        AiLlmError::Provider(ProviderError::new(
            LlmProvider::Gemini,
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: "https://example.invalid".into(),
                snippet: String::new(),
                retry_after_secs,
            }),
        ))
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
    }

    #[test]
    fn non_retryable_statuses() {
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(403));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(is_retryable(&status_err(StatusCode::INTERNAL_SERVER_ERROR, None)));
    }

    #[test]
    fn auth_errors_are_permanent() {
        assert!(!is_retryable(&status_err(StatusCode::UNAUTHORIZED, None)));
    }

    #[test]
    fn timeout_kind_is_retryable() {
        let err = AiLlmError::Provider(ProviderError::new(
            LlmProvider::DeepSeek,
            ProviderErrorKind::Timeout,
        ));
        assert!(is_retryable(&err));
    }

    #[test]
    fn decode_errors_are_permanent() {
        let err = AiLlmError::Provider(ProviderError::new(
            LlmProvider::DeepSeek,
            ProviderErrorKind::Decode("bad json".into()),
        ));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4_000));
        assert_eq!(backoff_delay(30), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(120));
        assert_eq!(parse_retry_after(" 5 "), Some(5));
    }

    #[test]
    fn parse_retry_after_past_date_is_zero() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), Some(0));
    }

    #[test]
    fn parse_retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn next_delay_prefers_server_reset() {
        let err = status_err(StatusCode::TOO_MANY_REQUESTS, Some(7));
        assert_eq!(next_delay(&err, 1), Duration::from_secs(7));
    }

    #[test]
    fn next_delay_falls_back_to_backoff() {
        let err = status_err(StatusCode::TOO_MANY_REQUESTS, None);
        assert_eq!(next_delay(&err, 2), Duration::from_millis(2_000));
    }
}
