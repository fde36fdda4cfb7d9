//! Tolerant parser for the model's block-structured review reply, plus the
//! stable rendering used for inline comment bodies.
//!
//! Grammar accepted:
//! - findings separated by lines containing only `---`
//! - labeled lines `**Label**: value` with labels Location, Issue Type,
//!   Description, Severity, Suggested Change
//! - unlabeled lines continue the most recent multi-line field
//!   (Description or Suggested Change), newlines preserved
//!
//! The parser never fails on malformed input: blocks without a usable
//! location or description are logged and dropped, missing fields get
//! defaults, and reported lines are clamped to the diff's visible
//! right-side range when known.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Exact reply the model gives when it found nothing worth reporting.
pub const NO_ISSUES_SENTINEL: &str = "No significant issues found. Good job!";

/// Marker embedded in every bot summary comment.
pub const SUMMARY_MARKER: &str = "<!-- code-critics-review -->";

/// Marker embedded in every bot inline comment.
pub const INLINE_MARKER: &str = "<!-- code-critics-comment -->";

const DEFAULT_ISSUE_TYPE: &str = "Code Issue";
const DEFAULT_DESCRIPTION: &str = "No description provided";
const DEFAULT_SUGGESTION: &str = "No specific change suggested";

/// Normalized finding severity, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed review finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub path: String,
    /// Right-side diff line, 1-based; defaulted to 1 when unparseable.
    pub line: u32,
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
    pub suggestion: String,
}

lazy_static! {
    static ref LABEL_RE: Regex = Regex::new(
        r"(?i)^\s*\*\*(Location|Issue Type|Description|Severity|Suggested Change)\*\*\s*:\s*(.*)$"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Location,
    IssueType,
    Description,
    Severity,
    SuggestedChange,
}

impl Label {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "location" => Self::Location,
            "issue type" => Self::IssueType,
            "description" => Self::Description,
            "severity" => Self::Severity,
            _ => Self::SuggestedChange,
        }
    }

    fn multi_line(self) -> bool {
        matches!(self, Self::Description | Self::SuggestedChange)
    }
}

/// Parses the raw model reply into findings.
///
/// `line_ranges` maps file paths to the maximum visible right-side line of
/// the diff; reported lines beyond the range are clamped down to it.
pub fn parse_findings(raw: &str, line_ranges: &HashMap<String, u32>) -> Vec<Finding> {
    if raw.contains(NO_ISSUES_SENTINEL) {
        return Vec::new();
    }

    split_blocks(raw)
        .into_iter()
        .filter_map(|block| match parse_block(&block, line_ranges) {
            Some(f) => Some(f),
            None => {
                debug!(block = %block.lines().next().unwrap_or(""), "dropping malformed finding block");
                None
            }
        })
        .collect()
}

/// Splits the reply at separator lines containing only `---`.
fn split_blocks(raw: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for line in raw.lines() {
        if line.trim() == "---" {
            if !current.trim().is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            current.clear();
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        blocks.push(current);
    }
    blocks
}

struct BlockFields {
    location: Option<String>,
    issue_type: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    suggestion: Option<String>,
}

fn parse_block(block: &str, line_ranges: &HashMap<String, u32>) -> Option<Finding> {
    let mut fields = BlockFields {
        location: None,
        issue_type: None,
        description: None,
        severity: None,
        suggestion: None,
    };
    let mut continuation: Option<Label> = None;

    for line in block.lines() {
        if let Some(caps) = LABEL_RE.captures(line) {
            let label = Label::parse(&caps[1]);
            let value = caps[2].trim().to_string();
            let slot = match label {
                Label::Location => &mut fields.location,
                Label::IssueType => &mut fields.issue_type,
                Label::Description => &mut fields.description,
                Label::Severity => &mut fields.severity,
                Label::SuggestedChange => &mut fields.suggestion,
            };
            *slot = Some(value);
            continuation = label.multi_line().then_some(label);
            continue;
        }

        // Unlabeled line: continue the most recent multi-line field.
        if let Some(label) = continuation {
            let slot = match label {
                Label::Description => &mut fields.description,
                Label::SuggestedChange => &mut fields.suggestion,
                _ => unreachable!("only multi-line labels continue"),
            };
            if let Some(text) = slot {
                text.push('\n');
                text.push_str(line.trim_end());
            }
        }
    }

    // A block needs at least a usable path and a Description label.
    let (path, line) = parse_location(fields.location.as_deref()?)?;
    let description = fields.description?;
    let description = if description.trim().is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        description.trim().to_string()
    };

    let line = clamp_line(&path, line, line_ranges);

    Some(Finding {
        path,
        line,
        issue_type: fields
            .issue_type
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
        severity: fields
            .severity
            .as_deref()
            .and_then(Severity::parse)
            .unwrap_or(Severity::Medium),
        description,
        suggestion: fields
            .suggestion
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUGGESTION.to_string()),
    })
}

/// Parses `path[:line]` with backticks stripped. A missing or non-positive
/// line defaults to 1; a missing path drops the block.
fn parse_location(raw: &str) -> Option<(String, u32)> {
    let cleaned = raw.trim().trim_matches('`').trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Some((path_part, line_part)) = cleaned.rsplit_once(':') {
        let line_part = line_part.trim();
        // Only an all-digit suffix is treated as a line reference; anything
        // else (e.g. `C:whatever`) keeps the colon as part of the path.
        if !line_part.is_empty() && line_part.bytes().all(|b| b.is_ascii_digit()) {
            let path = path_part.trim();
            if path.is_empty() {
                return None;
            }
            let line = line_part.parse::<u32>().unwrap_or(1).max(1);
            return Some((path.to_string(), line));
        }
    }

    Some((cleaned.to_string(), 1))
}

fn clamp_line(path: &str, line: u32, line_ranges: &HashMap<String, u32>) -> u32 {
    match line_ranges.get(path) {
        Some(&max) if max >= 1 => line.min(max),
        _ => line,
    }
}

/// Renders a finding into the stable inline comment body: the four labels
/// in order, followed by the inline marker.
pub fn render_finding_body(f: &Finding) -> String {
    format!(
        "**Issue Type**: {}\n**Description**: {}\n**Severity**: {}\n**Suggested Change**: {}\n\n{}",
        f.issue_type, f.description, f.severity, f.suggestion, INLINE_MARKER
    )
}

/// Strictest severity across findings; `Low` for an empty list.
pub fn summary_severity(findings: &[Finding]) -> Severity {
    findings
        .iter()
        .map(|f| f.severity)
        .min()
        .unwrap_or(Severity::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_ranges() -> HashMap<String, u32> {
        HashMap::new()
    }

    const TWO_BLOCKS: &str = "\
**Location**: `src/auth.rs:42`
**Issue Type**: Security Vulnerability
**Description**: Password compared with `==`, leaking timing.
**Severity**: Critical
**Suggested Change**: Use a constant-time comparison.
---
**Location**: src/db.rs:10
**Issue Type**: Bug
**Description**: Connection never released on error path.
**Severity**: High
**Suggested Change**: Wrap in a guard.
";

    #[test]
    fn parses_two_well_formed_blocks() {
        let findings = parse_findings(TWO_BLOCKS, &no_ranges());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].path, "src/auth.rs");
        assert_eq!(findings[0].line, 42);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[1].path, "src/db.rs");
        assert_eq!(findings[1].severity, Severity::High);
    }

    #[test]
    fn sentinel_short_circuits() {
        let raw = format!("Some preamble\n{NO_ISSUES_SENTINEL}\n");
        assert!(parse_findings(&raw, &no_ranges()).is_empty());
    }

    #[test]
    fn missing_optional_fields_get_defaults() {
        let raw = "**Location**: a.rs:3\n**Description**: something is off\n";
        let findings = parse_findings(raw, &no_ranges());
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.issue_type, DEFAULT_ISSUE_TYPE);
        assert_eq!(f.severity, Severity::Medium);
        assert_eq!(f.suggestion, DEFAULT_SUGGESTION);
    }

    #[test]
    fn block_without_location_is_dropped() {
        let raw = "**Description**: floating text\n**Severity**: High\n";
        assert!(parse_findings(raw, &no_ranges()).is_empty());
    }

    #[test]
    fn block_without_description_is_dropped() {
        let raw = "**Location**: a.rs:1\n**Severity**: High\n";
        assert!(parse_findings(raw, &no_ranges()).is_empty());
    }

    #[test]
    fn missing_line_defaults_to_one() {
        let raw = "**Location**: src/main.rs\n**Description**: d\n";
        let findings = parse_findings(raw, &no_ranges());
        assert_eq!(findings[0].line, 1);
        assert_eq!(findings[0].path, "src/main.rs");
    }

    #[test]
    fn non_numeric_line_keeps_whole_path() {
        let raw = "**Location**: C:whatever\n**Description**: d\n";
        let findings = parse_findings(raw, &no_ranges());
        assert_eq!(findings[0].path, "C:whatever");
        assert_eq!(findings[0].line, 1);
    }

    #[test]
    fn zero_line_defaults_to_one() {
        let raw = "**Location**: a.rs:0\n**Description**: d\n";
        let findings = parse_findings(raw, &no_ranges());
        assert_eq!(findings[0].line, 1);
        assert_eq!(findings[0].path, "a.rs");
    }

    #[test]
    fn multi_line_suggestion_is_preserved() {
        let raw = "\
**Location**: a.rs:5
**Description**: needs a guard
**Suggested Change**: replace with:
let Some(x) = maybe else {
    return;
};
**Severity**: Low
";
        let findings = parse_findings(raw, &no_ranges());
        let f = &findings[0];
        assert!(f.suggestion.contains("replace with:\nlet Some(x) = maybe else {"));
        // The labeled Severity line ended the continuation.
        assert_eq!(f.severity, Severity::Low);
    }

    #[test]
    fn multi_line_description_is_preserved() {
        let raw = "\
**Location**: a.rs:5
**Description**: first line
second line
**Suggested Change**: fix it
";
        let findings = parse_findings(raw, &no_ranges());
        assert_eq!(findings[0].description, "first line\nsecond line");
    }

    #[test]
    fn malformed_garbage_never_panics() {
        for raw in [
            "",
            "---",
            "--- --- ---",
            "random prose with no labels",
            "**Location**:",
            "**Location**: :::\n**Description**: d",
            "\u{0}\u{1}binary",
        ] {
            let _ = parse_findings(raw, &no_ranges());
        }
    }

    #[test]
    fn line_clamped_to_diff_range() {
        let mut ranges = HashMap::new();
        ranges.insert("a.rs".to_string(), 10u32);
        let raw = "**Location**: a.rs:500\n**Description**: d\n";
        let findings = parse_findings(raw, &ranges);
        assert_eq!(findings[0].line, 10);
    }

    #[test]
    fn line_within_range_untouched() {
        let mut ranges = HashMap::new();
        ranges.insert("a.rs".to_string(), 10u32);
        let raw = "**Location**: a.rs:7\n**Description**: d\n";
        let findings = parse_findings(raw, &ranges);
        assert_eq!(findings[0].line, 7);
    }

    #[test]
    fn unknown_file_not_clamped() {
        let mut ranges = HashMap::new();
        ranges.insert("other.rs".to_string(), 3u32);
        let raw = "**Location**: a.rs:500\n**Description**: d\n";
        let findings = parse_findings(raw, &ranges);
        assert_eq!(findings[0].line, 500);
    }

    #[test]
    fn rendered_body_has_labels_in_order_and_marker() {
        let findings = parse_findings(TWO_BLOCKS, &no_ranges());
        let body = render_finding_body(&findings[0]);

        let labels = [
            "**Issue Type**:",
            "**Description**:",
            "**Severity**:",
            "**Suggested Change**:",
        ];
        let mut last = 0;
        for label in labels {
            let pos = body.find(label).unwrap_or_else(|| panic!("missing {label}"));
            assert!(pos >= last, "label {label} out of order");
            last = pos;
        }
        assert!(body.ends_with(INLINE_MARKER));
    }

    #[test]
    fn render_parse_round_trip_keeps_labels() {
        let f = Finding {
            path: "x.rs".into(),
            line: 3,
            issue_type: "Bug".into(),
            severity: Severity::High,
            description: "desc".into(),
            suggestion: "fix".into(),
        };
        let body = render_finding_body(&f);
        assert!(body.contains("**Severity**: High"));
        assert!(body.contains("**Issue Type**: Bug"));
    }

    #[test]
    fn summary_severity_is_strictest() {
        let findings = parse_findings(TWO_BLOCKS, &no_ranges());
        assert_eq!(summary_severity(&findings), Severity::Critical);
        assert_eq!(summary_severity(&[]), Severity::Low);
    }
}
