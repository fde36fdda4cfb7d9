use serde::Serialize;

use llm_gateway::HealthStatus;
use reviewer::github::types::{Identity, RateLimitInfo};

/// Full health report returned by `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when the host identity check succeeded, else `degraded`.
    pub status: &'static str,
    pub config: ConfigEcho,
    pub github: GithubHealth,
    /// Probe of the active LLM provider; absent when no provider could be
    /// constructed at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<HealthStatus>,
}

/// Static configuration echo: presence of secrets and effective settings,
/// never the values themselves.
#[derive(Debug, Serialize)]
pub struct ConfigEcho {
    pub github_token_present: bool,
    pub webhook_secret_present: bool,
    pub ai_provider: String,
    /// True when the configured primary could not be constructed and the
    /// gateway runs on the fallback provider.
    pub provider_fallback_active: bool,
    pub max_diff_size: usize,
    pub allow_list_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct GithubHealth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitInfo>,
}
