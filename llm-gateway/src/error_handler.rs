//! Unified error types for the LLM gateway.
//!
//! Goals:
//! - Single root [`AiLlmError`] for all public gateway operations.
//! - Provider-aware error kinds (HTTP status, decode, empty candidates).
//! - Every error surface that could carry a provider response body goes
//!   through [`make_snippet`], which truncates and redacts before the text
//!   can reach a logger or a caller.

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::llm_provider::LlmProvider;
use crate::redaction;

/// Root error type for gateway operations.
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Provider-level failure (bad status, decode, missing key, ...).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Transport failure (DNS/connect/timeout) before any provider reply.
    #[error("[LLM Gateway] http transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),
}

impl AiLlmError {
    /// True when the failure happened before or at the transport layer and
    /// a retry could plausibly succeed.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::HttpTransport(e) => e.is_timeout(),
            Self::Provider(p) => matches!(p.kind, ProviderErrorKind::Timeout),
        }
    }
}

/// Detailed provider-specific error used inside the service layer.
#[derive(Debug, Error)]
#[error("[LLM Gateway] {provider} error: {kind}")]
pub struct ProviderError {
    pub provider: LlmProvider,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(provider: LlmProvider, kind: ProviderErrorKind) -> Self {
        Self { provider, kind }
    }
}

#[derive(Debug, Error)]
pub enum ProviderErrorKind {
    /// Config routed to the wrong service constructor.
    #[error("config addresses a different provider")]
    InvalidProvider,

    /// API key absent at construction time.
    #[error("missing API key")]
    MissingApiKey,

    /// Endpoint empty or not http(s).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Non-2xx response from the provider.
    #[error("http status error: {0}")]
    HttpStatus(HttpError),

    /// Body arrived but could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// 2xx reply without any usable candidate/choice text.
    #[error("empty candidates in response")]
    EmptyCandidates,

    /// Attempt exceeded its time budget.
    #[error("timeout")]
    Timeout,

    /// Neither primary nor fallback provider could be constructed.
    #[error("no usable provider: {0}")]
    Unavailable(String),
}

/// A non-2xx HTTP reply, with an already-redacted body snippet.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub url: String,
    pub snippet: String,
    /// Server-indicated reset delay (`Retry-After`), when present on a 429.
    pub retry_after_secs: Option<u64>,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status={} url={} body={}", self.status, self.url, self.snippet)
    }
}

/// Maximum characters of a provider body kept in an error snippet.
const SNIPPET_MAX_CHARS: usize = 300;

/// Builds a log-safe snippet from a provider response body: truncated and
/// redacted. In production mode the body is replaced wholesale.
pub fn make_snippet(text: &str) -> String {
    if redaction::production_mode() {
        return redaction::REDACTED_BODY.to_string();
    }
    let truncated: String = text.chars().take(SNIPPET_MAX_CHARS).collect();
    redaction::redact(&truncated)
}
