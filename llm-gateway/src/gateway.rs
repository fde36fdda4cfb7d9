//! Gateway facade: enum-dispatch over concrete provider services plus
//! primary/fallback selection and the per-call retry loop.

use tracing::{debug, info, warn};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
    retry,
    services::{deepseek_service::DeepSeekService, gemini_service::GeminiService},
};

/// Role of a chat message. The review pipeline only ever sends user
/// messages, but assistant turns are accepted for few-shot prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One ordered message in a chat completion request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Concrete provider service (enum-dispatch, no `Box<dyn ...>`).
#[derive(Debug)]
enum LlmService {
    Gemini(GeminiService),
    DeepSeek(DeepSeekService),
}

impl LlmService {
    fn from_config(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        match cfg.provider {
            LlmProvider::Gemini => Ok(Self::Gemini(GeminiService::new(cfg)?)),
            LlmProvider::DeepSeek => Ok(Self::DeepSeek(DeepSeekService::new(cfg)?)),
        }
    }

    fn config(&self) -> &LlmModelConfig {
        match self {
            Self::Gemini(s) => s.config(),
            Self::DeepSeek(s) => s.config(),
        }
    }

    async fn complete_once(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AiLlmError> {
        match self {
            Self::Gemini(s) => s.complete(system, messages).await,
            Self::DeepSeek(s) => s.complete(system, messages).await,
        }
    }
}

/// Chat gateway with a single selected backend.
///
/// Construct once at startup, wrap in `Arc`, and share across jobs; the
/// underlying HTTP client is safe for concurrent use and configuration is
/// never mutated per request.
#[derive(Debug)]
pub struct LlmGateway {
    service: LlmService,
    /// True when the configured primary could not be built and the gateway
    /// runs on the fallback provider. Reported by health.
    pub primary_degraded: bool,
}

impl LlmGateway {
    /// Builds the gateway from a primary config with optional fallback.
    ///
    /// The primary is tried first; when its construction fails (typically a
    /// missing API key) the fallback is attempted. Construction failures of
    /// the primary are logged at debug, not surfaced, as long as a fallback
    /// succeeds.
    pub fn from_configs(
        primary: LlmModelConfig,
        fallback: Option<LlmModelConfig>,
    ) -> Result<Self, AiLlmError> {
        let primary_provider = primary.provider;
        match LlmService::from_config(primary) {
            Ok(service) => {
                info!(provider = %primary_provider, "llm gateway ready (primary)");
                return Ok(Self {
                    service,
                    primary_degraded: false,
                });
            }
            Err(e) => {
                debug!(provider = %primary_provider, error = %e, "primary provider failed to construct");
            }
        }

        if let Some(fb) = fallback {
            let fb_provider = fb.provider;
            match LlmService::from_config(fb) {
                Ok(service) => {
                    warn!(
                        primary = %primary_provider,
                        fallback = %fb_provider,
                        "primary provider unavailable, using fallback"
                    );
                    return Ok(Self {
                        service,
                        primary_degraded: true,
                    });
                }
                Err(e) => {
                    debug!(provider = %fb_provider, error = %e, "fallback provider failed to construct");
                }
            }
        }

        Err(ProviderError::new(
            primary_provider,
            ProviderErrorKind::Unavailable(
                "neither primary nor fallback provider could be constructed".into(),
            ),
        )
        .into())
    }

    /// The provider actually in use.
    pub fn provider(&self) -> LlmProvider {
        self.service.config().provider
    }

    /// The active model config (for health checks and the config echo).
    pub fn model_config(&self) -> &LlmModelConfig {
        self.service.config()
    }

    /// Runs one chat completion under the retry policy: up to
    /// [`retry::MAX_ATTEMPTS`] attempts, exponential backoff from 1 s,
    /// 429 honoring the server-indicated reset. Permanent errors return
    /// immediately.
    pub async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AiLlmError> {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match self.service.complete_once(system, messages).await {
                Ok(text) => {
                    if attempt > 1 {
                        debug!(attempt, "completion succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(e) => {
                    if attempt >= retry::MAX_ATTEMPTS || !retry::is_retryable(&e) {
                        return Err(e);
                    }
                    let delay = retry::next_delay(&e, attempt);
                    debug!(
                        attempt,
                        max = retry::MAX_ATTEMPTS,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying completion"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Builds the review-tuned gateway from process environment:
/// `AI_PROVIDER` picks the primary (default gemini), `GEMINI_API_KEY` /
/// `DEEPSEEK_API_KEY` supply credentials, and the other provider acts as
/// fallback.
pub fn gateway_from_env() -> Result<LlmGateway, AiLlmError> {
    let primary_provider = std::env::var("AI_PROVIDER")
        .ok()
        .and_then(|v| LlmProvider::parse(&v))
        .unwrap_or(LlmProvider::Gemini);
    let fallback_provider = primary_provider.fallback();

    let primary = LlmModelConfig::review_default(primary_provider, api_key_for(primary_provider));
    let fallback =
        LlmModelConfig::review_default(fallback_provider, api_key_for(fallback_provider));

    LlmGateway::from_configs(primary, Some(fallback))
}

fn api_key_for(provider: LlmProvider) -> Option<String> {
    let var = match provider {
        LlmProvider::Gemini => "GEMINI_API_KEY",
        LlmProvider::DeepSeek => "DEEPSEEK_API_KEY",
    };
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(provider: LlmProvider, key: Option<&str>) -> LlmModelConfig {
        LlmModelConfig::review_default(provider, key.map(str::to_string))
    }

    #[test]
    fn primary_used_when_constructible() {
        let gw = LlmGateway::from_configs(
            cfg(LlmProvider::Gemini, Some("k1")),
            Some(cfg(LlmProvider::DeepSeek, Some("k2"))),
        )
        .unwrap();
        assert_eq!(gw.provider(), LlmProvider::Gemini);
        assert!(!gw.primary_degraded);
    }

    #[test]
    fn fallback_used_when_primary_missing_key() {
        let gw = LlmGateway::from_configs(
            cfg(LlmProvider::Gemini, None),
            Some(cfg(LlmProvider::DeepSeek, Some("k2"))),
        )
        .unwrap();
        assert_eq!(gw.provider(), LlmProvider::DeepSeek);
        assert!(gw.primary_degraded);
    }

    #[test]
    fn unavailable_when_both_fail() {
        let err = LlmGateway::from_configs(
            cfg(LlmProvider::Gemini, None),
            Some(cfg(LlmProvider::DeepSeek, None)),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no usable provider"));
    }

    #[test]
    fn no_fallback_means_primary_error_surfaces() {
        let err = LlmGateway::from_configs(cfg(LlmProvider::Gemini, None), None).unwrap_err();
        assert!(matches!(err, AiLlmError::Provider(_)));
    }

    #[test]
    fn chat_message_constructors() {
        let m = ChatMessage::user("hello");
        assert_eq!(m.role, Role::User);
        let m = ChatMessage::assistant("hi");
        assert_eq!(m.role, Role::Assistant);
    }
}
