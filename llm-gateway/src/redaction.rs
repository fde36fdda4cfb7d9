//! Secret redaction applied at the error/logging boundary.
//!
//! Any text that may carry credentials (provider error bodies, transport
//! error messages) passes through [`redact`] before it is logged or
//! propagated. Patterns covered:
//! - `Bearer <token>` authorization values
//! - `sk-...` style API keys
//! - `key: <value>` / `key=<value>` assignments
//! - long opaque tokens (32+ chars of `[A-Za-z0-9_-]`)

use lazy_static::lazy_static;
use regex::Regex;

/// Replacement for a single redacted span.
pub const REDACTED: &str = "[REDACTED]";

/// Wholesale replacement used for provider bodies in production mode.
pub const REDACTED_BODY: &str = "[Error details redacted in production]";

lazy_static! {
    static ref BEARER_RE: Regex = Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._~+/=-]+").unwrap();
    static ref SK_KEY_RE: Regex = Regex::new(r"\bsk-[A-Za-z0-9_-]+").unwrap();
    static ref KEY_ASSIGN_RE: Regex =
        Regex::new(r#"(?i)\b(api[_-]?key|key|token|secret)\s*[:=]\s*\S+"#).unwrap();
    static ref LONG_TOKEN_RE: Regex = Regex::new(r"[A-Za-z0-9_-]{32,}").unwrap();
}

/// Replaces credential-shaped spans with [`REDACTED`].
pub fn redact(input: &str) -> String {
    let out = BEARER_RE.replace_all(input, REDACTED);
    let out = SK_KEY_RE.replace_all(&out, REDACTED);
    let out = KEY_ASSIGN_RE.replace_all(&out, |caps: &regex::Captures| {
        // Keep the key name so the log stays diagnosable.
        format!("{}: {}", &caps[1], REDACTED)
    });
    let out = LONG_TOKEN_RE.replace_all(&out, REDACTED);
    out.into_owned()
}

/// True when the process runs with `ENVIRONMENT=production`.
pub fn production_mode() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|v| v.trim().eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}
