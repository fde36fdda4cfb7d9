//! Terminal review outcomes and the error-to-outcome mapping.
//!
//! The orchestrator converts every pipeline failure into a terminal state
//! with a stable, sanitized user-visible phrase; raw error text never
//! reaches the PR.

use llm_gateway::error_handler::{AiLlmError, ProviderErrorKind};

use crate::errors::{Error, HostError};
use crate::findings::{Finding, Severity};

/// Why a job ended without a published review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DiffTooLarge,
    NoSupportedFiles,
    DuplicateRecent,
    RateLimited,
    Disallowed,
}

impl SkipReason {
    /// Short description used in commit statuses and log fields.
    pub fn describe(self) -> &'static str {
        match self {
            Self::DiffTooLarge => "Review skipped - diff too large",
            Self::NoSupportedFiles => "Review skipped - no supported file types",
            Self::DuplicateRecent => "Review skipped - recent review exists",
            Self::RateLimited => "Review skipped - rate limit exceeded",
            Self::Disallowed => "Review skipped - repository not allowed",
        }
    }

    /// PR-visible notice, where one is posted at all.
    pub fn notice(self) -> &'static str {
        match self {
            Self::DiffTooLarge => {
                "Review skipped: this change is too large to review automatically, \
                 even after filtering to supported file types."
            }
            Self::NoSupportedFiles => {
                "Review skipped: this change contains no supported file types."
            }
            Self::RateLimited => "Rate limit exceeded - please try again later.",
            // Duplicate and disallowed skips are silent.
            Self::DuplicateRecent | Self::Disallowed => "",
        }
    }
}

/// Category of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, 5xx, 429 after retries.
    Transient,
    /// Non-retriable host or validation failure.
    Permanent,
    /// Neither primary nor fallback provider is usable.
    ProviderUnavailable,
    /// The job deadline or a call timeout elapsed.
    Timeout,
    /// Unexpected panic or invariant violation.
    InternalBug,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::Timeout => "timeout",
            Self::InternalBug => "internal_bug",
        }
    }
}

/// Terminal result of one review job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Model reviewed the diff and found nothing worth reporting.
    NoIssues,
    /// Findings were published; the severity is the strictest among them.
    Findings(Vec<Finding>, Severity),
    Skipped(SkipReason),
    Failed(FailureKind),
}

/// Classifies a pipeline error into a failure category.
pub fn classify_failure(err: &Error) -> FailureKind {
    match err {
        Error::Host(HostError::Timeout) => FailureKind::Timeout,
        Error::Host(h) if h.is_retryable() => FailureKind::Transient,
        Error::Host(_) => FailureKind::Permanent,
        Error::Llm(e) => classify_llm(e),
        Error::Config(_) => FailureKind::Permanent,
        Error::Validation(_) => FailureKind::Permanent,
        Error::Other(_) => FailureKind::InternalBug,
    }
}

fn classify_llm(err: &AiLlmError) -> FailureKind {
    match err {
        AiLlmError::HttpTransport(e) if e.is_timeout() => FailureKind::Timeout,
        AiLlmError::HttpTransport(_) => FailureKind::Transient,
        AiLlmError::Provider(p) => match &p.kind {
            ProviderErrorKind::Timeout => FailureKind::Timeout,
            ProviderErrorKind::Unavailable(_) => FailureKind::ProviderUnavailable,
            ProviderErrorKind::MissingApiKey | ProviderErrorKind::InvalidProvider => {
                FailureKind::ProviderUnavailable
            }
            ProviderErrorKind::HttpStatus(h) if h.status.as_u16() >= 500 => FailureKind::Transient,
            ProviderErrorKind::HttpStatus(h) if h.status.as_u16() == 429 => FailureKind::Transient,
            _ => FailureKind::Permanent,
        },
    }
}

/// Maps an error to the stable phrase shown on the PR. Raw error details are
/// never included here.
pub fn user_message(err: &Error) -> &'static str {
    const AUTH: &str = "Authentication configuration issue detected.";
    const NETWORK: &str = "Network connectivity issue encountered.";
    const TIMEOUT: &str = "Request timeout - the review took too long to complete.";
    const RATE_LIMIT: &str = "Rate limit exceeded - please try again later.";
    const OTHER: &str = "An unexpected error occurred during the review process.";

    match err {
        Error::Host(HostError::Unauthorized) | Error::Host(HostError::Forbidden) => AUTH,
        Error::Host(HostError::RateLimited { .. }) => RATE_LIMIT,
        Error::Host(HostError::Timeout) => TIMEOUT,
        Error::Host(HostError::Network(_)) => NETWORK,
        Error::Llm(AiLlmError::HttpTransport(e)) if e.is_timeout() => TIMEOUT,
        Error::Llm(AiLlmError::HttpTransport(_)) => NETWORK,
        Error::Llm(AiLlmError::Provider(p)) => match &p.kind {
            ProviderErrorKind::Timeout => TIMEOUT,
            ProviderErrorKind::MissingApiKey => AUTH,
            ProviderErrorKind::HttpStatus(h) if matches!(h.status.as_u16(), 401 | 403) => AUTH,
            ProviderErrorKind::HttpStatus(h) if h.status.as_u16() == 429 => RATE_LIMIT,
            _ => OTHER,
        },
        _ => OTHER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_gateway::LlmProvider;
    use llm_gateway::error_handler::{HttpError, ProviderError};
    use reqwest::StatusCode;

    fn llm_status(status: StatusCode) -> Error {
        Error::Llm(AiLlmError::Provider(ProviderError::new(
            LlmProvider::Gemini,
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: "https://example.invalid".into(),
                snippet: String::new(),
                retry_after_secs: None,
            }),
        )))
    }

    #[test]
    fn host_errors_classify() {
        assert_eq!(
            classify_failure(&Error::Host(HostError::Timeout)),
            FailureKind::Timeout
        );
        assert_eq!(
            classify_failure(&Error::Host(HostError::Server(502))),
            FailureKind::Transient
        );
        assert_eq!(
            classify_failure(&Error::Host(HostError::NotFound)),
            FailureKind::Permanent
        );
    }

    #[test]
    fn llm_errors_classify() {
        assert_eq!(
            classify_failure(&llm_status(StatusCode::INTERNAL_SERVER_ERROR)),
            FailureKind::Transient
        );
        assert_eq!(
            classify_failure(&llm_status(StatusCode::BAD_REQUEST)),
            FailureKind::Permanent
        );
        let unavailable = Error::Llm(AiLlmError::Provider(ProviderError::new(
            LlmProvider::Gemini,
            ProviderErrorKind::Unavailable("none".into()),
        )));
        assert_eq!(classify_failure(&unavailable), FailureKind::ProviderUnavailable);
    }

    #[test]
    fn user_messages_are_stable_phrases() {
        assert_eq!(
            user_message(&Error::Host(HostError::Unauthorized)),
            "Authentication configuration issue detected."
        );
        assert_eq!(
            user_message(&Error::Host(HostError::Network("reset".into()))),
            "Network connectivity issue encountered."
        );
        assert_eq!(
            user_message(&Error::Host(HostError::Timeout)),
            "Request timeout - the review took too long to complete."
        );
        assert_eq!(
            user_message(&Error::Host(HostError::RateLimited {
                retry_after_secs: None
            })),
            "Rate limit exceeded - please try again later."
        );
        assert_eq!(
            user_message(&Error::Validation("whatever".into())),
            "An unexpected error occurred during the review process."
        );
    }

    #[test]
    fn provider_auth_status_maps_to_auth_phrase() {
        assert_eq!(
            user_message(&llm_status(StatusCode::UNAUTHORIZED)),
            "Authentication configuration issue detected."
        );
    }

    #[test]
    fn user_message_never_leaks_error_detail() {
        let err = Error::Host(HostError::Network("connect to 10.0.0.5 failed".into()));
        assert!(!user_message(&err).contains("10.0.0.5"));
    }

    #[test]
    fn skip_descriptions_are_stable() {
        assert_eq!(
            SkipReason::DiffTooLarge.describe(),
            "Review skipped - diff too large"
        );
        assert!(SkipReason::DuplicateRecent.notice().is_empty());
        assert!(SkipReason::Disallowed.notice().is_empty());
        assert!(!SkipReason::RateLimited.notice().is_empty());
    }
}
