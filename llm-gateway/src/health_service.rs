//! Health checks for LLM backends (Gemini, DeepSeek).
//!
//! Lightweight reachability probes:
//! - Gemini: `GET {endpoint}/v1beta/models?pageSize=1` with `x-goog-api-key`
//! - DeepSeek: `GET {endpoint}/models` with Bearer auth
//!
//! [`HealthService::check`] is resilient and never fails: any error is
//! mapped to `ok=false` with a redacted message, which is convenient for a
//! `/health` endpoint.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, make_snippet};

/// A serializable health snapshot for a single provider config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend/provider name ("gemini", "deepseek").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model identifier the gateway would use.
    pub model: Option<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the probe.
    pub latency_ms: u128,
    /// Short human-readable message with details (already redacted).
    pub message: String,
}

impl HealthStatus {
    fn ok(cfg: &LlmModelConfig, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider.to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok: true,
            latency_ms,
            message: message.into(),
        }
    }

    fn fail(cfg: &LlmModelConfig, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider.to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok: false,
            latency_ms,
            message: message.into(),
        }
    }
}

/// A provider health checker that reuses a single HTTP client.
#[derive(Debug)]
pub struct HealthService {
    client: reqwest::Client,
}

impl HealthService {
    /// Creates a new health service with an optional probe timeout (seconds,
    /// default 10).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Probes the given config, never returning an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            warn!(provider = %cfg.provider, endpoint = %cfg.endpoint, "invalid endpoint for health probe");
            return HealthStatus::fail(cfg, 0, "endpoint is empty or missing http/https");
        }

        let Some(api_key) = cfg.api_key.as_deref() else {
            return HealthStatus::fail(cfg, 0, "api key not configured");
        };

        let base = endpoint.trim_end_matches('/');
        let started = Instant::now();

        let request = match cfg.provider {
            LlmProvider::Gemini => self
                .client
                .get(format!("{base}/v1beta/models?pageSize=1"))
                .header("x-goog-api-key", api_key),
            LlmProvider::DeepSeek => self
                .client
                .get(format!("{base}/models"))
                .bearer_auth(api_key),
        };

        match request.send().await {
            Ok(resp) => {
                let latency = started.elapsed().as_millis();
                let status = resp.status();
                if status.is_success() {
                    info!(provider = %cfg.provider, latency_ms = latency, "provider health probe ok");
                    HealthStatus::ok(cfg, latency, "reachable")
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    HealthStatus::fail(
                        cfg,
                        latency,
                        format!("status {}: {}", status, make_snippet(&body)),
                    )
                }
            }
            Err(e) => {
                let latency = started.elapsed().as_millis();
                HealthStatus::fail(cfg, latency, make_snippet(&e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_endpoint_fails_without_network() {
        let svc = HealthService::new(Some(1)).unwrap();
        let mut cfg = LlmModelConfig::review_default(LlmProvider::Gemini, Some("k".into()));
        cfg.endpoint = "not-a-url".into();
        let status = svc.check(&cfg).await;
        assert!(!status.ok);
        assert!(status.message.contains("http"));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = LlmModelConfig::review_default(LlmProvider::DeepSeek, None);
        let status = svc.check(&cfg).await;
        assert!(!status.ok);
        assert!(status.message.contains("api key"));
    }
}
