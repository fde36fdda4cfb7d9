use std::fmt;

/// Represents the provider (backend) used for chat-completion inference.
///
/// Adding more providers in the future (e.g., Anthropic Claude, Mistral API)
/// can be done by extending this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Google Gemini REST API (`models/{model}:generateContent`).
    Gemini,
    /// DeepSeek API (OpenAI-compatible `/chat/completions`).
    DeepSeek,
}

impl LlmProvider {
    /// The other provider, used for fallback selection.
    pub fn fallback(self) -> Self {
        match self {
            Self::Gemini => Self::DeepSeek,
            Self::DeepSeek => Self::Gemini,
        }
    }

    /// Parses a provider name as it appears in `AI_PROVIDER`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "deepseek" => Some(Self::DeepSeek),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_providers() {
        assert_eq!(LlmProvider::parse("gemini"), Some(LlmProvider::Gemini));
        assert_eq!(LlmProvider::parse("DeepSeek"), Some(LlmProvider::DeepSeek));
        assert_eq!(LlmProvider::parse(" gemini "), Some(LlmProvider::Gemini));
    }

    #[test]
    fn parse_unknown_provider() {
        assert_eq!(LlmProvider::parse("openai"), None);
        assert_eq!(LlmProvider::parse(""), None);
    }

    #[test]
    fn fallback_is_the_other_provider() {
        assert_eq!(LlmProvider::Gemini.fallback(), LlmProvider::DeepSeek);
        assert_eq!(LlmProvider::DeepSeek.fallback(), LlmProvider::Gemini);
    }
}
