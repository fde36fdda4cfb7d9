pub mod deepseek_service;
pub mod gemini_service;
