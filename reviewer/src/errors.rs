//! Crate-wide error hierarchy for the review pipeline.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Host-aware mapping (401→Unauthorized, 429→RateLimited, 5xx→Server, etc.)
//!   so the orchestrator can tell retriable from permanent failures.
//! - No dynamic dispatch, ergonomic `?` via `From` impls.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ReviewResult<T> = Result<T, Error>;

/// Root error type for the reviewer crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Source-host (GitHub) related failure.
    #[error(transparent)]
    Host(#[from] HostError),

    /// LLM gateway failure.
    #[error(transparent)]
    Llm(#[from] llm_gateway::AiLlmError),

    /// Configuration problems (bad/missing env values).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors (bad payloads, malformed URLs, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Generic catch-all error when nothing else fits.
    #[error("other error: {0}")]
    Other(String),
}

impl Error {
    /// True when another attempt could plausibly succeed (network, 5xx,
    /// timeouts, host rate limiting).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Host(h) => h.is_retryable(),
            Error::Llm(e) => llm_gateway::retry::is_retryable(e),
            _ => false,
        }
    }
}

/// Detailed host-specific error used inside the GitHub client layer.
#[derive(Debug, Error)]
pub enum HostError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Gateway/Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (4xx/3xx) not covered above.
    #[error("http status error: {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// JSON deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Unexpected/invalid shape of a host response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl HostError {
    /// Maps a bare status code to the closest variant.
    pub fn from_status(code: u16) -> Self {
        match code {
            401 => HostError::Unauthorized,
            403 => HostError::Forbidden,
            404 => HostError::NotFound,
            429 => HostError::RateLimited {
                retry_after_secs: None,
            },
            500..=599 => HostError::Server(code),
            _ => HostError::HttpStatus(code),
        }
    }

    /// Retriable: timeouts, network failures, 5xx and 429.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HostError::Timeout
                | HostError::Network(_)
                | HostError::Server(_)
                | HostError::RateLimited { .. }
        )
    }
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (ports, limits, sizes).
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Unsupported value in an enumerated variable.
    #[error("invalid value in {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        reason: &'static str,
    },
}

// ===== Conversions for `?` ergonomics =====

impl From<reqwest::Error> for HostError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return HostError::Timeout;
        }
        if let Some(status) = e.status() {
            return HostError::from_status(status.as_u16());
        }
        // Transport error messages can echo request URLs; scrub them the
        // same way the gateway scrubs provider bodies.
        HostError::Network(llm_gateway::redaction::redact(&e.to_string()))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Host(HostError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(HostError::from_status(401), HostError::Unauthorized));
        assert!(matches!(HostError::from_status(403), HostError::Forbidden));
        assert!(matches!(HostError::from_status(404), HostError::NotFound));
        assert!(matches!(
            HostError::from_status(429),
            HostError::RateLimited { .. }
        ));
        assert!(matches!(HostError::from_status(502), HostError::Server(502)));
        assert!(matches!(
            HostError::from_status(418),
            HostError::HttpStatus(418)
        ));
    }

    #[test]
    fn retryable_classification() {
        assert!(HostError::Timeout.is_retryable());
        assert!(HostError::Network("reset".into()).is_retryable());
        assert!(HostError::Server(503).is_retryable());
        assert!(
            HostError::RateLimited {
                retry_after_secs: None
            }
            .is_retryable()
        );
        assert!(!HostError::Unauthorized.is_retryable());
        assert!(!HostError::NotFound.is_retryable());
        assert!(!HostError::HttpStatus(422).is_retryable());
    }

    #[test]
    fn root_error_delegates_retryability() {
        let err = Error::Host(HostError::Server(500));
        assert!(err.is_retryable());
        let err = Error::Validation("bad".into());
        assert!(!err.is_retryable());
    }
}
