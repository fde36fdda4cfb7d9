//! Provider-polymorphic LLM gateway.
//!
//! - Two concrete chat services: Google Gemini (`generateContent`) and
//!   DeepSeek (OpenAI-compatible chat completions), enum-dispatched without
//!   `async-trait` or heap trait objects.
//! - Primary/fallback selection at construction time: the configured
//!   provider is tried first; if it cannot be built (missing key, bad
//!   endpoint) the other provider is attempted.
//! - Per-call retry with exponential backoff; 429 honors the
//!   server-indicated reset when present.
//! - Error surfaces are normalized and redacted before they ever reach a
//!   logger or a caller.

pub mod config;
pub mod error_handler;
pub mod gateway;
pub mod health_service;
pub mod redaction;
pub mod retry;
pub mod services;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::AiLlmError;
pub use gateway::{ChatMessage, LlmGateway, Role};
pub use health_service::{HealthService, HealthStatus};
