//! Dedup oracle: decides whether an automatic run would duplicate a recent
//! review by inspecting the bot's own summary comments on the PR.
//!
//! A bot summary is any comment carrying the summary marker; its embedded
//! `<!-- timestamp: <epoch-ms> -->` marker says when it was posted. Only the
//! most recent one matters, and only automatic triggers are ever skipped.

use lazy_static::lazy_static;
use regex::Regex;

use crate::findings::SUMMARY_MARKER;
use crate::github::types::IssueComment;

/// A summary younger than this is considered a duplicate for auto triggers.
pub const RECENT_WINDOW_MS: i64 = 60 * 60 * 1000;

lazy_static! {
    static ref TIMESTAMP_RE: Regex = Regex::new(r"<!--\s*timestamp:\s*(\d+)\s*-->").unwrap();
}

/// Renders the timestamp marker embedded in summary comments.
pub fn timestamp_marker(epoch_ms: i64) -> String {
    format!("<!-- timestamp: {epoch_ms} -->")
}

/// Extracts the embedded timestamp from a comment body, if present.
pub fn extract_timestamp(body: &str) -> Option<i64> {
    TIMESTAMP_RE
        .captures(body)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// The most recent bot summary found on a PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSummary {
    pub comment_id: u64,
    pub posted_at_ms: i64,
}

impl BotSummary {
    /// Recent iff posted within [`RECENT_WINDOW_MS`] of `now_ms`.
    pub fn is_recent(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.posted_at_ms) < RECENT_WINDOW_MS
    }
}

/// Scans PR comments for the newest bot summary (by embedded timestamp).
///
/// Comments without a parseable timestamp marker are treated as ancient:
/// they identify a bot summary but never count as recent.
pub fn find_latest_summary(comments: &[IssueComment]) -> Option<BotSummary> {
    comments
        .iter()
        .filter(|c| c.body.contains(SUMMARY_MARKER))
        .map(|c| BotSummary {
            comment_id: c.id,
            posted_at_ms: extract_timestamp(&c.body).unwrap_or(0),
        })
        .max_by_key(|s| s.posted_at_ms)
}

/// True when an automatic run should be skipped as a duplicate.
pub fn is_duplicate_auto_run(comments: &[IssueComment], now_ms: i64) -> bool {
    find_latest_summary(comments).is_some_and(|s| s.is_recent(now_ms))
}
