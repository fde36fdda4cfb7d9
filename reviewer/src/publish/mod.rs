//! Publisher: reflects review outcomes back to the source host.
//!
//! Capabilities: summary PR comment, review with inline comments, commit
//! status, and human-readable skip/failure notices. Every bot-posted body
//! carries a stable HTML marker (and, for summaries, a timestamp marker)
//! so the dedup oracle can recognize it later.
//!
//! Each capability fails independently: notice/comment failures are logged
//! and swallowed so they never disturb an already-committed status, while
//! the orchestrator decides what a review-creation failure means for the
//! job.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::ReviewResult;
use crate::findings::{
    Finding, INLINE_MARKER, NO_ISSUES_SENTINEL, SUMMARY_MARKER, Severity, render_finding_body,
    summary_severity,
};
use crate::github::types::{InlineComment, RepoRef, ReviewEvent, StatusState};
use crate::github::GitHubClient;
use crate::review::outcome::SkipReason;
use crate::dedup::timestamp_marker;

/// Commit status context under which all states are reported.
pub const STATUS_CONTEXT: &str = "CodeCritic AI Review";

/// Publisher bound to one PR head.
#[derive(Debug, Clone)]
pub struct Publisher {
    client: Arc<GitHubClient>,
    repo: RepoRef,
    pull_number: u64,
    head_sha: String,
}

impl Publisher {
    pub fn new(
        client: Arc<GitHubClient>,
        repo: RepoRef,
        pull_number: u64,
        head_sha: String,
    ) -> Self {
        Self {
            client,
            repo,
            pull_number,
            head_sha,
        }
    }

    /// Sets the commit status on the PR head. Errors propagate; status
    /// ordering (`pending` before any terminal state) is the orchestrator's
    /// contract with the host UI.
    pub async fn set_status(&self, state: StatusState, description: &str) -> ReviewResult<()> {
        self.client
            .create_commit_status(
                &self.repo.owner,
                &self.repo.name,
                &self.head_sha,
                state,
                description,
                STATUS_CONTEXT,
            )
            .await
    }

    /// Best-effort status write for terminal paths where a second failure
    /// must not mask the first.
    pub async fn set_status_logged(&self, state: StatusState, description: &str) {
        if let Err(e) = self.set_status(state, description).await {
            warn!(
                repo = %self.repo.full_name,
                pull = self.pull_number,
                error = %e,
                "failed to set commit status"
            );
        }
    }

    /// Posts the summary comment, appending the summary and timestamp
    /// markers.
    pub async fn post_summary(&self, body: &str) -> ReviewResult<()> {
        let stamped = format!(
            "{body}\n\n{SUMMARY_MARKER}\n{}",
            timestamp_marker(Utc::now().timestamp_millis())
        );
        self.client
            .create_pr_issue_comment(&self.repo.owner, &self.repo.name, self.pull_number, &stamped)
            .await
    }

    /// Creates one review carrying all inline comments.
    pub async fn post_review(&self, findings: &[Finding], event: ReviewEvent) -> ReviewResult<()> {
        let comments: Vec<InlineComment> = findings
            .iter()
            .map(|f| InlineComment {
                path: f.path.clone(),
                line: f.line,
                body: render_finding_body(f),
            })
            .collect();

        let body = format!(
            "Automated review: {} issue(s) flagged on the changed files.\n\n{INLINE_MARKER}",
            findings.len()
        );

        self.client
            .create_review(
                &self.repo.owner,
                &self.repo.name,
                self.pull_number,
                &body,
                event,
                &comments,
            )
            .await?;

        info!(
            repo = %self.repo.full_name,
            pull = self.pull_number,
            inline = comments.len(),
            event = event.as_str(),
            "review published"
        );
        Ok(())
    }

    /// Posts a notice comment, logging instead of failing. Used for skip,
    /// rate-limit, and failure messages where the job outcome is already
    /// decided.
    pub async fn post_notice_logged(&self, body: &str) {
        if body.is_empty() {
            return;
        }
        if let Err(e) = self
            .client
            .create_pr_issue_comment(&self.repo.owner, &self.repo.name, self.pull_number, body)
            .await
        {
            warn!(
                repo = %self.repo.full_name,
                pull = self.pull_number,
                error = %e,
                "failed to post notice comment"
            );
        }
    }

    /// Posts the PR-visible notice for a skip reason (no-op for silent
    /// reasons).
    pub async fn post_skip_notice(&self, reason: SkipReason) {
        self.post_notice_logged(reason.notice()).await;
    }
}

/// Summary body for a finding-bearing review (markers appended at post time).
pub fn findings_summary_body(findings: &[Finding]) -> String {
    let severity = summary_severity(findings);
    let mut body = format!(
        "## CodeCritic AI Review\n\nFound **{}** issue(s). Highest severity: **{severity}**.\n\n",
        findings.len()
    );
    for f in findings.iter().take(10) {
        body.push_str(&format!("- `{}:{}` {} ({})\n", f.path, f.line, f.issue_type, f.severity));
    }
    if findings.len() > 10 {
        body.push_str(&format!("- ... and {} more\n", findings.len() - 10));
    }
    body.push_str("\nSee the inline comments on the changed files for details.");
    body
}

/// Summary body for a clean review.
pub fn no_issues_body() -> String {
    format!("## CodeCritic AI Review\n\n{NO_ISSUES_SENTINEL}")
}

/// Commit status description for a finding-bearing review.
pub fn findings_status_description(count: usize, severity: Severity) -> String {
    format!("Found {count} issue(s), highest severity {severity}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(path: &str, severity: Severity) -> Finding {
        Finding {
            path: path.into(),
            line: 1,
            issue_type: "Bug".into(),
            severity,
            description: "d".into(),
            suggestion: "s".into(),
        }
    }

    #[test]
    fn findings_summary_names_count_and_severity() {
        let findings = vec![
            finding("a.rs", Severity::Medium),
            finding("b.rs", Severity::Critical),
        ];
        let body = findings_summary_body(&findings);
        assert!(body.contains("**2** issue(s)"));
        assert!(body.contains("**Critical**"));
        assert!(body.contains("`a.rs:1`"));
    }

    #[test]
    fn findings_summary_truncates_long_lists() {
        let findings: Vec<Finding> = (0..15)
            .map(|i| finding(&format!("f{i}.rs"), Severity::Low))
            .collect();
        let body = findings_summary_body(&findings);
        assert!(body.contains("and 5 more"));
    }

    #[test]
    fn no_issues_body_carries_sentinel() {
        assert!(no_issues_body().contains(NO_ISSUES_SENTINEL));
    }

    #[test]
    fn status_description_is_short() {
        let d = findings_status_description(3, Severity::High);
        assert!(d.len() < 140);
        assert!(d.contains("3 issue(s)"));
    }
}
