//! Admission control: repository allow-list, per-key sliding-window rate
//! limiting, and per-PR job locks.
//!
//! The rate-limit table and the lock registry are the only mutable
//! process-wide state in the service; both live behind `std::sync::Mutex`
//! and are touched only for short critical sections (no await points while
//! holding a lock).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::AppConfig;

/// What started a review job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Webhook-driven PR change.
    Auto,
    /// `@codecritics` mention in a PR comment.
    Manual,
}

impl Trigger {
    /// Rate-limit key for a repository: manual triggers get an independent
    /// budget under a `#manual` suffix.
    pub fn rate_key(self, full_name: &str) -> String {
        match self {
            Self::Auto => full_name.to_string(),
            Self::Manual => format!("{full_name}#manual"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted,
    /// Repository not on the configured allow-list. Silent, internal.
    Disallowed,
    /// Sliding-window budget exhausted. User-visible notice is posted.
    RateLimited,
}

#[derive(Debug, Clone, Copy)]
struct RateEntry {
    count: u32,
    window_reset_at: Instant,
}

/// Bounded sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    max_keys: usize,
    entries: Mutex<HashMap<String, RateEntry>>,
}

impl RateLimiter {
    /// Default bound on tracked keys.
    pub const DEFAULT_MAX_KEYS: usize = 10_000;

    pub fn new(max: u32, window: Duration, max_keys: usize) -> Self {
        Self {
            max,
            window,
            max_keys,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Consumes one budget unit for `key`, returning false on overflow.
    pub fn try_acquire(&self, key: &str) -> bool {
        self.try_acquire_at(key, Instant::now())
    }

    /// Clock-injected variant; the public entry always passes `Instant::now()`.
    fn try_acquire_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().expect("rate limiter lock poisoned");

        if let Some(entry) = entries.get_mut(key) {
            if now >= entry.window_reset_at {
                // Window elapsed: counting starts over.
                entry.count = 1;
                entry.window_reset_at = now + self.window;
                return true;
            }
            if entry.count >= self.max {
                return false;
            }
            entry.count += 1;
            return true;
        }

        if entries.len() >= self.max_keys {
            Self::evict(&mut entries, now);
        }

        entries.insert(
            key.to_string(),
            RateEntry {
                count: 1,
                window_reset_at: now + self.window,
            },
        );
        true
    }

    /// Drops expired entries; if none were expired, drops the entry closest
    /// to expiry so the table never exceeds its bound.
    fn evict(entries: &mut HashMap<String, RateEntry>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, e| e.window_reset_at > now);
        if entries.len() < before {
            debug!(evicted = before - entries.len(), "rate limiter evicted expired entries");
            return;
        }
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, e)| e.window_reset_at)
            .map(|(k, _)| k.clone())
        {
            warn!(%key, "rate limiter full, evicting entry closest to expiry");
            entries.remove(&key);
        }
    }

    /// Number of currently tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.entries.lock().expect("rate limiter lock poisoned").len()
    }
}

/// Combined allow-list + rate-limit admission check.
#[derive(Debug)]
pub struct Admission {
    allow_list: Vec<String>,
    limiter: RateLimiter,
}

impl Admission {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            allow_list: config.allowed_repositories.clone(),
            limiter: RateLimiter::new(
                config.rate_limit_max,
                Duration::from_secs(config.rate_limit_window_secs),
                RateLimiter::DEFAULT_MAX_KEYS,
            ),
        }
    }

    /// True when the repo may be reviewed at all.
    pub fn repo_allowed(&self, full_name: &str) -> bool {
        self.allow_list.is_empty() || self.allow_list.iter().any(|r| r == full_name)
    }

    /// Runs both checks in order: allow-list, then the trigger-scoped
    /// sliding window.
    pub fn check(&self, full_name: &str, trigger: Trigger) -> AdmissionDecision {
        if !self.repo_allowed(full_name) {
            return AdmissionDecision::Disallowed;
        }
        if !self.limiter.try_acquire(&trigger.rate_key(full_name)) {
            return AdmissionDecision::RateLimited;
        }
        AdmissionDecision::Admitted
    }
}

/// Registry of in-flight review jobs keyed by `(repo, pull, head_sha)`.
///
/// A second event for a key that is already running is coalesced rather than
/// queued; the caller reports it as a duplicate.
#[derive(Debug, Default)]
pub struct JobLocks {
    running: Arc<Mutex<HashSet<String>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_key(full_name: &str, pull_number: u64, head_sha: &str) -> String {
        format!("{full_name}#{pull_number}@{head_sha}")
    }

    /// Claims the key, returning a guard that releases it on drop, or `None`
    /// when a job for the same key is already running.
    pub fn try_claim(&self, key: &str) -> Option<JobGuard> {
        let mut running = self.running.lock().expect("job lock registry poisoned");
        if !running.insert(key.to_string()) {
            return None;
        }
        Some(JobGuard {
            registry: Arc::clone(&self.running),
            key: key.to_string(),
        })
    }
}

/// RAII claim over a job key.
#[derive(Debug)]
pub struct JobGuard {
    registry: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if let Ok(mut running) = self.registry.lock() {
            running.remove(&self.key);
        }
    }
}
