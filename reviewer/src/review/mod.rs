//! Review orchestrator: the pipeline state machine.
//!
//! Stages for a single job:
//!
//! 1. **Admitting**: per-key job lock, allow-list, rate limit, dedup oracle
//!    (auto triggers only), then `pending` commit status.
//! 2. **Fetching**: PR metadata, then the unified diff (validated diff URL
//!    or compare fallback).
//! 3. **Processing**: size-adaptive filter/skip policy.
//! 4. **Prompting**: gateway completion under retry.
//! 5. **Parsing**: block grammar into findings.
//! 6. **Publishing**: inline review + summary comment + terminal status.
//!
//! The whole admitted run sits under a 60 s deadline; expiry aborts
//! in-flight calls and nothing further is published beyond the error path.
//! Failures become terminal outcomes with sanitized notices; statuses are
//! totally ordered per job (`pending` first, exactly one terminal write).

pub mod outcome;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use llm_gateway::LlmGateway;

use crate::admission::{Admission, AdmissionDecision, JobLocks, Trigger};
use crate::config::{AppConfig, LARGE_DIFF_MULTIPLIER};
use crate::dedup;
use crate::diff::{fetch::fetch_diff, process, process::SizeDecision, scan};
use crate::errors::Error;
use crate::findings::{self, Severity};
use crate::github::GitHubClient;
use crate::github::types::{PullRequest, RepoRef, ReviewEvent, StatusState};
use crate::intake::{EventKind, WebhookEvent};
use crate::prompt;
use crate::publish::{
    Publisher, findings_status_description, findings_summary_body, no_issues_body,
};

pub use outcome::{FailureKind, ReviewOutcome, SkipReason, classify_failure, user_message};

/// Wall-clock budget for one admitted job.
pub const JOB_DEADLINE: Duration = Duration::from_secs(60);

/// Constructor-injected dependencies for the orchestrator.
///
/// All handles are shared and safe for concurrent use; nothing here is
/// mutated per job. `gateway` is `None` when neither provider could be
/// constructed at startup, in which case every job fails with
/// `ProviderUnavailable`.
#[derive(Clone)]
pub struct ReviewContext {
    pub config: Arc<AppConfig>,
    pub github: Arc<GitHubClient>,
    pub gateway: Option<Arc<LlmGateway>>,
    pub admission: Arc<Admission>,
    pub job_locks: Arc<JobLocks>,
}

/// One review job, created from an admitted envelope.
#[derive(Debug, Clone)]
pub struct ReviewJob {
    pub job_id: String,
    pub delivery_id: String,
    pub repo: RepoRef,
    pub pull_number: u64,
    /// Known up front for auto triggers; learned from PR metadata for
    /// manual ones.
    pub head_sha: Option<String>,
    pub diff_url: Option<String>,
    pub trigger: Trigger,
    pub started_at: Instant,
}

impl ReviewJob {
    /// Builds a job from a classified envelope; `None` for event kinds that
    /// never start a review.
    pub fn from_event(event: &WebhookEvent) -> Option<Self> {
        let trigger = match event.kind {
            EventKind::PrChanged => Trigger::Auto,
            EventKind::MentionComment => Trigger::Manual,
            EventKind::Ping | EventKind::Other => return None,
        };
        Some(Self {
            job_id: Uuid::new_v4().to_string(),
            delivery_id: event.delivery_id.clone(),
            repo: event.repo.clone(),
            pull_number: event.pull_number?,
            head_sha: event.head_sha.clone(),
            diff_url: event.diff_url.clone(),
            trigger,
            started_at: Instant::now(),
        })
    }

    fn lock_key(&self) -> String {
        JobLocks::job_key(
            &self.repo.full_name,
            self.pull_number,
            self.head_sha.as_deref().unwrap_or("manual"),
        )
    }
}

/// Pipeline stage, carried in failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Admitting,
    Fetching,
    Processing,
    Prompting,
    Parsing,
    Publishing,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admitting => "admitting",
            Self::Fetching => "fetching",
            Self::Processing => "processing",
            Self::Prompting => "prompting",
            Self::Parsing => "parsing",
            Self::Publishing => "publishing",
        }
    }
}

type StageResult = Result<ReviewOutcome, (Stage, Error)>;

/// Runs one review job to a terminal outcome. Never panics outward; the
/// caller converts task panics to `Failed(InternalBug)`.
pub async fn run_review(ctx: &ReviewContext, job: ReviewJob) -> ReviewOutcome {
    let t0 = Instant::now();
    info!(
        job_id = %job.job_id,
        delivery_id = %job.delivery_id,
        repo = %job.repo.full_name,
        pull = job.pull_number,
        trigger = job.trigger.as_str(),
        "review job started"
    );

    // One orchestrator per (repo, pull, head) at a time; a concurrent
    // second event is coalesced, not queued.
    let Some(_guard) = ctx.job_locks.try_claim(&job.lock_key()) else {
        info!(
            repo = %job.repo.full_name,
            pull = job.pull_number,
            "job already running for this head, coalescing"
        );
        return ReviewOutcome::Skipped(SkipReason::DuplicateRecent);
    };

    match ctx.admission.check(&job.repo.full_name, job.trigger) {
        AdmissionDecision::Admitted => {}
        AdmissionDecision::Disallowed => {
            debug!(repo = %job.repo.full_name, "repository not on allow-list");
            return ReviewOutcome::Skipped(SkipReason::Disallowed);
        }
        AdmissionDecision::RateLimited => {
            info!(
                repo = %job.repo.full_name,
                trigger = job.trigger.as_str(),
                "admission rate limit exceeded"
            );
            publisher_for(ctx, &job)
                .post_notice_logged(SkipReason::RateLimited.notice())
                .await;
            return ReviewOutcome::Skipped(SkipReason::RateLimited);
        }
    }

    let mut job = job;
    let result = {
        let fut = run_admitted(ctx, &mut job);
        tokio::time::timeout(JOB_DEADLINE, fut).await
    };

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err((stage, err))) => handle_failure(ctx, &job, stage, err).await,
        Err(_elapsed) => handle_deadline(ctx, &job).await,
    };

    info!(
        job_id = %job.job_id,
        repo = %job.repo.full_name,
        pull = job.pull_number,
        elapsed_ms = t0.elapsed().as_millis(),
        outcome = outcome_name(&outcome),
        "review job finished"
    );
    outcome
}

/// The admitted pipeline: meta/dedup → pending status → diff → policy →
/// LLM → parse → publish.
async fn run_admitted(ctx: &ReviewContext, job: &mut ReviewJob) -> StageResult {
    let cfg = &ctx.config;
    let github = &ctx.github;

    // --- Fetching: PR metadata and changed files, with the dedup oracle's
    // comment listing in parallel for auto triggers.
    debug!("fetching: pull request metadata");
    let (pull, files, duplicate_recent) = if job.trigger == Trigger::Auto {
        let (meta, files, comments) = tokio::join!(
            github.get_pull_request(&job.repo.owner, &job.repo.name, job.pull_number),
            github.list_files(&job.repo.owner, &job.repo.name, job.pull_number),
            github.list_pr_comments(&job.repo.owner, &job.repo.name, job.pull_number),
        );
        let pull = meta.map_err(|e| (Stage::Fetching, e))?;
        let files = files.map_err(|e| (Stage::Fetching, e))?;
        let comments = comments.map_err(|e| (Stage::Fetching, e))?;
        let dup = dedup::is_duplicate_auto_run(&comments, Utc::now().timestamp_millis());
        (pull, files, dup)
    } else {
        let (meta, files) = tokio::join!(
            github.get_pull_request(&job.repo.owner, &job.repo.name, job.pull_number),
            github.list_files(&job.repo.owner, &job.repo.name, job.pull_number),
        );
        let pull = meta.map_err(|e| (Stage::Fetching, e))?;
        let files = files.map_err(|e| (Stage::Fetching, e))?;
        (pull, files, false)
    };

    job.head_sha = Some(pull.head_sha.clone());

    if duplicate_recent {
        info!(
            repo = %job.repo.full_name,
            pull = job.pull_number,
            "recent bot review exists, skipping automatic run"
        );
        return Ok(ReviewOutcome::Skipped(SkipReason::DuplicateRecent));
    }

    let publisher = Publisher::new(
        Arc::clone(github),
        job.repo.clone(),
        job.pull_number,
        pull.head_sha.clone(),
    );

    publisher
        .set_status(StatusState::Pending, "CodeCritic review in progress")
        .await
        .map_err(|e| (Stage::Admitting, e))?;

    // --- Fetching: the diff itself.
    debug!("fetching: unified diff");
    let effective_pull = with_envelope_diff_url(&pull, job.diff_url.clone());
    let mut diff = fetch_diff(github, &job.repo, &effective_pull)
        .await
        .map_err(|e| (Stage::Fetching, e))?;
    if diff.trim().is_empty() {
        // Providers occasionally answer with an empty body for a fresh
        // head while the file list already carries patches.
        diff = crate::diff::fetch::diff_from_files(&files);
        debug!(bytes = diff.len(), "fetching: diff rebuilt from file patches");
    }
    debug!(bytes = diff.len(), "fetching: diff ready");

    // --- Processing: size-adaptive policy.
    let diff = match process::apply_size_policy(
        &diff,
        cfg.max_diff_size,
        LARGE_DIFF_MULTIPLIER,
        &cfg.allowed_extensions,
    ) {
        SizeDecision::Proceed { diff, filtered } => {
            debug!(bytes = diff.len(), filtered, "processing: diff accepted");
            diff
        }
        SizeDecision::NoSupportedFiles => {
            return skip(&publisher, SkipReason::NoSupportedFiles).await;
        }
        SizeDecision::TooLarge { size } => {
            debug!(bytes = size, "processing: filtered diff still too large");
            return skip(&publisher, SkipReason::DiffTooLarge).await;
        }
    };

    // --- Prompting.
    let gateway = ctx.gateway.as_deref().ok_or_else(|| {
        (
            Stage::Prompting,
            Error::Llm(llm_gateway::error_handler::ProviderError::new(
                cfg.ai_provider,
                llm_gateway::error_handler::ProviderErrorKind::Unavailable(
                    "gateway unavailable since startup".into(),
                ),
            )
            .into()),
        )
    })?;

    debug!(provider = %gateway.provider(), "prompting: requesting completion");
    let messages = prompt::build_messages(&diff);
    let reply = gateway
        .complete(prompt::SYSTEM_PROMPT, &messages)
        .await
        .map_err(|e| (Stage::Prompting, Error::Llm(e)))?;

    // --- Parsing.
    let ranges = scan::right_side_ranges(&diff);
    let found = findings::parse_findings(&reply, &ranges);
    debug!(count = found.len(), "parsing: findings extracted");

    // --- Publishing.
    if found.is_empty() {
        publisher
            .post_summary(&no_issues_body())
            .await
            .map_err(|e| (Stage::Publishing, e))?;
        publisher
            .set_status_logged(StatusState::Success, "No issues found")
            .await;
        return Ok(ReviewOutcome::NoIssues);
    }

    let severity = findings::summary_severity(&found);
    let event = choose_review_event(cfg, severity);
    publisher
        .post_review(&found, event)
        .await
        .map_err(|e| (Stage::Publishing, e))?;
    // Summary comment is an independent capability; its failure is logged
    // without disturbing the review that already went out.
    if let Err(e) = publisher.post_summary(&findings_summary_body(&found)).await {
        error!(error = %e, "summary comment failed after review was published");
    }
    publisher
        .set_status_logged(
            cfg.findings_commit_state,
            &findings_status_description(found.len(), severity),
        )
        .await;

    Ok(ReviewOutcome::Findings(found, severity))
}

/// A completed review with findings is surfaced as `REQUEST_CHANGES` only
/// when explicitly configured and the findings warrant it.
pub fn choose_review_event(cfg: &AppConfig, severity: Severity) -> ReviewEvent {
    if cfg.review_request_changes && severity <= Severity::High {
        ReviewEvent::RequestChanges
    } else {
        ReviewEvent::Comment
    }
}

async fn skip(publisher: &Publisher, reason: SkipReason) -> StageResult {
    publisher.post_skip_notice(reason).await;
    publisher
        .set_status_logged(StatusState::Success, reason.describe())
        .await;
    Ok(ReviewOutcome::Skipped(reason))
}

async fn handle_failure(
    ctx: &ReviewContext,
    job: &ReviewJob,
    stage: Stage,
    err: Error,
) -> ReviewOutcome {
    let kind = classify_failure(&err);
    error!(
        repo = %job.repo.full_name,
        pull = job.pull_number,
        trigger = job.trigger.as_str(),
        stage = stage.as_str(),
        kind = kind.as_str(),
        error = %err,
        "review job failed"
    );

    let phrase = user_message(&err);
    report_failure(ctx, job, phrase).await;
    ReviewOutcome::Failed(kind)
}

async fn handle_deadline(ctx: &ReviewContext, job: &ReviewJob) -> ReviewOutcome {
    error!(
        repo = %job.repo.full_name,
        pull = job.pull_number,
        trigger = job.trigger.as_str(),
        stage = "deadline",
        kind = FailureKind::Timeout.as_str(),
        "review job hit its deadline"
    );
    report_failure(
        ctx,
        job,
        "Request timeout - the review took too long to complete.",
    )
    .await;
    ReviewOutcome::Failed(FailureKind::Timeout)
}

/// Terminal error reporting: sanitized PR comment plus `error` status when
/// the head SHA is known. Both writes are best-effort.
async fn report_failure(ctx: &ReviewContext, job: &ReviewJob, phrase: &str) {
    let publisher = publisher_for(ctx, job);
    publisher
        .post_notice_logged(&format!("CodeCritic review failed. {phrase}"))
        .await;
    if job.head_sha.is_some() {
        publisher
            .set_status_logged(StatusState::Error, phrase)
            .await;
    }
}

fn publisher_for(ctx: &ReviewContext, job: &ReviewJob) -> Publisher {
    Publisher::new(
        Arc::clone(&ctx.github),
        job.repo.clone(),
        job.pull_number,
        job.head_sha.clone().unwrap_or_default(),
    )
}

/// Prefer the envelope's diff URL over the one echoed by the API; both pass
/// the same validation before use.
fn with_envelope_diff_url(pull: &PullRequest, envelope_url: Option<String>) -> PullRequest {
    let mut effective = pull.clone();
    if envelope_url.is_some() {
        effective.diff_url = envelope_url;
    }
    effective
}

fn outcome_name(outcome: &ReviewOutcome) -> &'static str {
    match outcome {
        ReviewOutcome::NoIssues => "no_issues",
        ReviewOutcome::Findings(..) => "findings",
        ReviewOutcome::Skipped(_) => "skipped",
        ReviewOutcome::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(request_changes: bool) -> AppConfig {
        AppConfig {
            github_token: "t".into(),
            webhook_secret: "s".into(),
            ai_provider: llm_gateway::LlmProvider::Gemini,
            max_diff_size: 100_000,
            allowed_repositories: vec![],
            allowed_extensions: vec![".rs".into()],
            port: 3000,
            findings_commit_state: StatusState::Failure,
            review_request_changes: request_changes,
            max_concurrent_jobs: 64,
            rate_limit_max: 10,
            rate_limit_window_secs: 3600,
        }
    }

    fn pr_event() -> WebhookEvent {
        WebhookEvent {
            delivery_id: "d-1".into(),
            kind: EventKind::PrChanged,
            action: "opened".into(),
            repo: RepoRef {
                owner: "alice".into(),
                name: "repo".into(),
                full_name: "alice/repo".into(),
                private: false,
            },
            pull_number: Some(7),
            diff_url: Some("https://github.com/alice/repo/pull/7.diff".into()),
            head_sha: Some("abc".into()),
            comment_body: None,
            commenter: None,
        }
    }

    #[test]
    fn job_from_pr_changed_is_auto() {
        let job = ReviewJob::from_event(&pr_event()).unwrap();
        assert_eq!(job.trigger, Trigger::Auto);
        assert_eq!(job.pull_number, 7);
        assert_eq!(job.head_sha.as_deref(), Some("abc"));
        assert!(!job.job_id.is_empty());
    }

    #[test]
    fn job_from_mention_is_manual() {
        let mut event = pr_event();
        event.kind = EventKind::MentionComment;
        event.head_sha = None;
        event.comment_body = Some("@codecritics".into());
        let job = ReviewJob::from_event(&event).unwrap();
        assert_eq!(job.trigger, Trigger::Manual);
        assert!(job.head_sha.is_none());
    }

    #[test]
    fn ping_and_other_make_no_job() {
        let mut event = pr_event();
        event.kind = EventKind::Ping;
        assert!(ReviewJob::from_event(&event).is_none());
        event.kind = EventKind::Other;
        assert!(ReviewJob::from_event(&event).is_none());
    }

    #[test]
    fn default_review_event_is_comment() {
        let cfg = test_config(false);
        assert_eq!(choose_review_event(&cfg, Severity::Critical), ReviewEvent::Comment);
        assert_eq!(choose_review_event(&cfg, Severity::Low), ReviewEvent::Comment);
    }

    #[test]
    fn request_changes_only_for_serious_findings() {
        let cfg = test_config(true);
        assert_eq!(
            choose_review_event(&cfg, Severity::Critical),
            ReviewEvent::RequestChanges
        );
        assert_eq!(
            choose_review_event(&cfg, Severity::High),
            ReviewEvent::RequestChanges
        );
        assert_eq!(choose_review_event(&cfg, Severity::Medium), ReviewEvent::Comment);
    }

    #[test]
    fn lock_key_includes_head_sha() {
        let job = ReviewJob::from_event(&pr_event()).unwrap();
        assert_eq!(job.lock_key(), "alice/repo#7@abc");
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(Stage::Admitting.as_str(), "admitting");
        assert_eq!(Stage::Publishing.as_str(), "publishing");
    }
}
