//! Process-wide configuration loaded from the environment.
//!
//! `AppConfig::from_env()` fails fast on missing required keys
//! (`GITHUB_TOKEN`, `WEBHOOK_SECRET`); everything else has a default.
//! Built once at startup, wrapped in `Arc`, never mutated afterwards.

use llm_gateway::LlmProvider;

use crate::errors::ConfigError;
use crate::github::types::StatusState;

/// Default byte threshold at which extension filtering kicks in.
pub const DEFAULT_MAX_DIFF_SIZE: usize = 100_000;

/// Filtered diffs above `max_diff_size * LARGE_DIFF_MULTIPLIER` are skipped.
pub const LARGE_DIFF_MULTIPLIER: f64 = 1.5;

/// Default sliding-window budget: 10 reviews per repository per hour.
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 10;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 3_600;

/// Default cap on concurrently running review jobs.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 64;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Extensions reviewed when no `ALLOWED_FILE_EXTENSIONS` override is set.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    ".ts", ".js", ".jsx", ".tsx", ".py", ".java", ".cpp", ".c", ".go", ".rs", ".php", ".rb",
    ".cs", ".swift", ".kt", ".scala", ".sh", ".sql", ".json", ".yaml", ".yml", ".md",
];

/// Validated process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Credential for the source host (required).
    pub github_token: String,
    /// HMAC-SHA256 secret for webhook signature verification (required).
    pub webhook_secret: String,
    /// Primary LLM provider; the other one acts as fallback.
    pub ai_provider: LlmProvider,
    /// Byte threshold at which extension filtering kicks in.
    pub max_diff_size: usize,
    /// Optional allow-list of `owner/name` full names. Empty = allow all.
    pub allowed_repositories: Vec<String>,
    /// Reviewed file extensions (leading dot, lowercase).
    pub allowed_extensions: Vec<String>,
    /// Listening port.
    pub port: u16,
    /// Commit state set when a review produced findings.
    pub findings_commit_state: StatusState,
    /// Post reviews with `REQUEST_CHANGES` when a Critical/High finding exists.
    pub review_request_changes: bool,
    /// Cap on concurrently running review jobs.
    pub max_concurrent_jobs: usize,
    /// Sliding-window admission budget per key.
    pub rate_limit_max: u32,
    /// Sliding-window length in seconds.
    pub rate_limit_window_secs: u64,
}

impl AppConfig {
    /// Reads and validates configuration from the process environment.
    ///
    /// # Errors
    /// [`ConfigError::MissingVar`] for absent required secrets,
    /// [`ConfigError::InvalidNumber`]/[`ConfigError::InvalidValue`] for
    /// malformed optional values (malformed values fail fast rather than
    /// being silently defaulted).
    pub fn from_env() -> Result<Self, ConfigError> {
        let github_token = must_env("GITHUB_TOKEN")?;
        let webhook_secret = must_env("WEBHOOK_SECRET")?;

        let ai_provider = match std::env::var("AI_PROVIDER") {
            Ok(v) if !v.trim().is_empty() => {
                LlmProvider::parse(&v).ok_or(ConfigError::InvalidValue {
                    var: "AI_PROVIDER",
                    reason: "expected `gemini` or `deepseek`",
                })?
            }
            _ => LlmProvider::Gemini,
        };

        let max_diff_size =
            env_opt_usize("MAX_DIFF_SIZE")?.unwrap_or(DEFAULT_MAX_DIFF_SIZE);

        let allowed_repositories = env_csv("ALLOWED_REPOSITORIES");

        let allowed_extensions = {
            let overrides = env_csv("ALLOWED_FILE_EXTENSIONS");
            if overrides.is_empty() {
                DEFAULT_ALLOWED_EXTENSIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            } else {
                overrides
                    .into_iter()
                    .map(|e| {
                        let e = e.to_ascii_lowercase();
                        if e.starts_with('.') { e } else { format!(".{e}") }
                    })
                    .collect()
            }
        };

        let port = env_opt_u16("PORT")?.unwrap_or(DEFAULT_PORT);

        let findings_commit_state = match std::env::var("FINDINGS_COMMIT_STATE") {
            Ok(v) if !v.trim().is_empty() => match v.trim().to_ascii_lowercase().as_str() {
                "failure" => StatusState::Failure,
                "success" => StatusState::Success,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "FINDINGS_COMMIT_STATE",
                        reason: "expected `failure` or `success`",
                    });
                }
            },
            _ => StatusState::Failure,
        };

        let review_request_changes = env_bool("REVIEW_REQUEST_CHANGES", false);

        let max_concurrent_jobs =
            env_opt_usize("MAX_CONCURRENT_JOBS")?.unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS);
        let rate_limit_max = env_opt_u32("RATE_LIMIT_MAX")?.unwrap_or(DEFAULT_RATE_LIMIT_MAX);
        let rate_limit_window_secs =
            env_opt_u64("RATE_LIMIT_WINDOW_SECS")?.unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);

        Ok(Self {
            github_token,
            webhook_secret,
            ai_provider,
            max_diff_size,
            allowed_repositories,
            allowed_extensions,
            port,
            findings_commit_state,
            review_request_changes,
            max_concurrent_jobs,
            rate_limit_max,
            rate_limit_window_secs,
        })
    }
}

/* ------------------------ Env helpers ------------------------ */

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn env_csv(name: &str) -> Vec<String> {
    std::env::var(name)
        .ok()
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

macro_rules! env_opt_num {
    ($fn_name:ident, $ty:ty, $reason:literal) => {
        fn $fn_name(name: &'static str) -> Result<Option<$ty>, ConfigError> {
            match std::env::var(name) {
                Ok(v) if !v.trim().is_empty() => v
                    .trim()
                    .parse::<$ty>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: name,
                        reason: $reason,
                    }),
                _ => Ok(None),
            }
        }
    };
}

env_opt_num!(env_opt_usize, usize, "expected usize");
env_opt_num!(env_opt_u16, u16, "expected u16");
env_opt_num!(env_opt_u32, u32, "expected u32");
env_opt_num!(env_opt_u64, u64, "expected u64");

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "GITHUB_TOKEN",
            "WEBHOOK_SECRET",
            "AI_PROVIDER",
            "MAX_DIFF_SIZE",
            "ALLOWED_REPOSITORIES",
            "ALLOWED_FILE_EXTENSIONS",
            "PORT",
            "FINDINGS_COMMIT_STATE",
            "REVIEW_REQUEST_CHANGES",
            "MAX_CONCURRENT_JOBS",
            "RATE_LIMIT_MAX",
            "RATE_LIMIT_WINDOW_SECS",
        ] {
            unsafe { std::env::remove_var(var) };
        }
    }

    fn set_required() {
        unsafe {
            std::env::set_var("GITHUB_TOKEN", "ghp_test");
            std::env::set_var("WEBHOOK_SECRET", "hook_secret");
        }
    }

    #[test]
    #[serial]
    fn fails_fast_on_missing_token() {
        clear_env();
        unsafe { std::env::set_var("WEBHOOK_SECRET", "s") };
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    #[serial]
    fn fails_fast_on_missing_secret() {
        clear_env();
        unsafe { std::env::set_var("GITHUB_TOKEN", "t") };
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("WEBHOOK_SECRET"));
    }

    #[test]
    #[serial]
    fn defaults_applied() {
        clear_env();
        set_required();
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.ai_provider, LlmProvider::Gemini);
        assert_eq!(cfg.max_diff_size, DEFAULT_MAX_DIFF_SIZE);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert!(cfg.allowed_repositories.is_empty());
        assert!(cfg.allowed_extensions.contains(&".rs".to_string()));
        assert_eq!(cfg.findings_commit_state, StatusState::Failure);
        assert_eq!(cfg.rate_limit_max, DEFAULT_RATE_LIMIT_MAX);
        assert_eq!(cfg.max_concurrent_jobs, DEFAULT_MAX_CONCURRENT_JOBS);
    }

    #[test]
    #[serial]
    fn overrides_parsed() {
        clear_env();
        set_required();
        unsafe {
            std::env::set_var("AI_PROVIDER", "deepseek");
            std::env::set_var("MAX_DIFF_SIZE", "1000");
            std::env::set_var("ALLOWED_REPOSITORIES", "alice/repo, bob/tool");
            std::env::set_var("ALLOWED_FILE_EXTENSIONS", "rs,.go");
            std::env::set_var("PORT", "8080");
            std::env::set_var("FINDINGS_COMMIT_STATE", "success");
        }
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.ai_provider, LlmProvider::DeepSeek);
        assert_eq!(cfg.max_diff_size, 1000);
        assert_eq!(
            cfg.allowed_repositories,
            vec!["alice/repo".to_string(), "bob/tool".to_string()]
        );
        assert_eq!(cfg.allowed_extensions, vec![".rs".to_string(), ".go".to_string()]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.findings_commit_state, StatusState::Success);
    }

    #[test]
    #[serial]
    fn invalid_number_is_an_error() {
        clear_env();
        set_required();
        unsafe { std::env::set_var("MAX_DIFF_SIZE", "lots") };
        assert!(AppConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn invalid_provider_is_an_error() {
        clear_env();
        set_required();
        unsafe { std::env::set_var("AI_PROVIDER", "gpt4") };
        assert!(AppConfig::from_env().is_err());
    }
}
