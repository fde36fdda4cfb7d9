//! Core pipeline for the code-critics review service.
//!
//! One webhook delivery flows through:
//!
//! 1. **Intake**: HMAC signature verification and envelope classification
//!    (`intake`), done synchronously before the dispatcher ACKs.
//! 2. **Admission**: allow-list, per-repository sliding-window rate limits,
//!    and per-PR job locks (`admission`).
//! 3. **Acquisition**: PR metadata and the unified diff, with SSRF-guarded
//!    use of the envelope's diff URL (`github`, `diff::fetch`).
//! 4. **Shaping**: size-adaptive filtering and file-boundary chunking
//!    (`diff::process`).
//! 5. **Analysis**: chat completion through the provider gateway and the
//!    tolerant block parser (`prompt`, `findings`).
//! 6. **Publishing**: inline review, summary comment, and commit status
//!    (`publish`), deduplicated against earlier bot summaries (`dedup`).
//!
//! The orchestrator in `review` owns timeouts, cancellation, and the
//! error-to-outcome mapping. All state is in-process; a restart loses
//! nothing but in-flight jobs, and redelivered events are absorbed by the
//! dedup oracle.
//!
//! The crate avoids `async-trait` and heap trait objects; provider and host
//! dispatch use plain `async fn` on concrete types, with errors unified by
//! `errors::Error`.

pub mod admission;
pub mod config;
pub mod dedup;
pub mod diff;
pub mod errors;
pub mod findings;
pub mod github;
pub mod intake;
pub mod prompt;
pub mod publish;
pub mod review;

// -----------------------------------------------------------------------------
// Convenience re-exports for downstream users (the HTTP layer)
// -----------------------------------------------------------------------------

pub use admission::{Admission, JobLocks, Trigger};
pub use config::AppConfig;
pub use errors::{ConfigError, Error, HostError, ReviewResult};
pub use github::GitHubClient;
pub use intake::{EventKind, FieldError, WebhookEvent, classify, sanitize_for_log, verify_signature};
pub use publish::{Publisher, STATUS_CONTEXT};
pub use review::{
    FailureKind, ReviewContext, ReviewJob, ReviewOutcome, SkipReason, run_review,
};
