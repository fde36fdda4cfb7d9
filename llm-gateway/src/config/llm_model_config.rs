use crate::config::llm_provider::LlmProvider;

/// Configuration for a single chat-model invocation target.
///
/// One value fully describes a provider backend: which API to call, with
/// which model, credentials, sampling knobs, and timeout. Values are built
/// once at startup and never mutated per request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend (Gemini or DeepSeek).
    pub provider: LlmProvider,

    /// Model identifier string (e.g., `"gemini-2.0-flash"`, `"deepseek-chat"`).
    pub model: String,

    /// API base URL (e.g., `"https://generativelanguage.googleapis.com"`).
    pub endpoint: String,

    /// API key for authentication. Required by both supported providers.
    pub api_key: Option<String>,

    /// Maximum number of output tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature. Review calls use a low value for determinism.
    pub temperature: Option<f32>,

    /// Request timeout in seconds for a single attempt.
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Default review-tuned config for a provider: low temperature, bounded
    /// output, 60 s per-attempt timeout, public endpoint and current default
    /// model of the provider.
    pub fn review_default(provider: LlmProvider, api_key: Option<String>) -> Self {
        let (endpoint, model) = match provider {
            LlmProvider::Gemini => (
                "https://generativelanguage.googleapis.com".to_string(),
                "gemini-2.0-flash".to_string(),
            ),
            LlmProvider::DeepSeek => (
                "https://api.deepseek.com".to_string(),
                "deepseek-chat".to_string(),
            ),
        };

        Self {
            provider,
            model,
            endpoint,
            api_key,
            max_tokens: Some(2048),
            temperature: Some(0.1),
            timeout_secs: Some(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_default_gemini() {
        let cfg = LlmModelConfig::review_default(LlmProvider::Gemini, Some("k".into()));
        assert_eq!(cfg.provider, LlmProvider::Gemini);
        assert!(cfg.endpoint.starts_with("https://"));
        assert_eq!(cfg.max_tokens, Some(2048));
        assert_eq!(cfg.timeout_secs, Some(60));
    }

    #[test]
    fn review_default_deepseek_has_low_temperature() {
        let cfg = LlmModelConfig::review_default(LlmProvider::DeepSeek, None);
        assert!(cfg.temperature.unwrap() < 0.5);
    }
}
