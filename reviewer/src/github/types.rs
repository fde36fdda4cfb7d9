//! Normalized data model for the source-host (GitHub) client.
//!
//! These types are the provider-neutral output of the host layer and are
//! consumed by admission, the diff pipeline, the dedup oracle, and the
//! publisher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository reference as carried by every event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub private: bool,
}

impl RepoRef {
    /// Placeholder used while accumulating validation errors.
    pub fn unknown() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            full_name: String::new(),
            private: false,
        }
    }
}

/// Authenticated identity on the source host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub login: String,
    pub id: u64,
}

/// Pull request metadata subset the pipeline needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub head_sha: String,
    pub base_sha: String,
    pub diff_url: Option<String>,
}

/// One changed file as reported by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    /// Unified diff for the file; absent for binary/too-large files.
    pub patch: Option<String>,
}

/// An issue (PR-level) comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    pub user_login: String,
    pub created_at: DateTime<Utc>,
}

/// Commit status states accepted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

impl StatusState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

/// Review event kind used when creating a PR review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    Comment,
    RequestChanges,
}

impl ReviewEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "COMMENT",
            Self::RequestChanges => "REQUEST_CHANGES",
        }
    }
}

/// One inline review comment bound to a `(path, line)` in the diff.
#[derive(Debug, Clone, Serialize)]
pub struct InlineComment {
    pub path: String,
    pub line: u32,
    pub body: String,
}

/// Host API quota snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_state_wire_names() {
        assert_eq!(StatusState::Pending.as_str(), "pending");
        assert_eq!(StatusState::Success.as_str(), "success");
        assert_eq!(StatusState::Failure.as_str(), "failure");
        assert_eq!(StatusState::Error.as_str(), "error");
    }

    #[test]
    fn review_event_wire_names() {
        assert_eq!(ReviewEvent::Comment.as_str(), "COMMENT");
        assert_eq!(ReviewEvent::RequestChanges.as_str(), "REQUEST_CHANGES");
    }
}
