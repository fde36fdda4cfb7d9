//! Structural validation of the webhook event envelope.
//!
//! Classifies an incoming delivery as *pull-request-changed*,
//! *mention-comment*, *ping*, or *other* (ignored). Validation failures are
//! reported as a list of field errors for the 400 response; classification
//! itself never fails for well-formed payloads.

use serde_json::Value;

use crate::github::types::RepoRef;

/// Marker mention that triggers a manual re-review from a PR comment.
pub const MENTION_TOKEN: &str = "@codecritics";

/// `pull_request` actions that trigger an automatic review.
pub const PR_ACTIONS: &[&str] = &["opened", "synchronize", "reopened"];

/// Free-text fields in logged payloads are cut to this many characters.
const LOG_TEXT_MAX: usize = 100;

/// Classified kind of an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A pull request was opened, synchronized, or reopened.
    PrChanged,
    /// A PR comment mentioning the review bot was created.
    MentionComment,
    /// GitHub webhook ping.
    Ping,
    /// Anything else; acknowledged and ignored.
    Other,
}

/// Immutable event envelope produced by classification.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub delivery_id: String,
    pub kind: EventKind,
    pub action: String,
    pub repo: RepoRef,
    pub pull_number: Option<u64>,
    pub diff_url: Option<String>,
    pub head_sha: Option<String>,
    pub comment_body: Option<String>,
    pub commenter: Option<String>,
}

/// One structural defect in an incoming payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path like `pull_request.number`.
    pub path: String,
    /// What the validator expected.
    pub hint: String,
}

impl FieldError {
    fn new(path: &str, hint: &str) -> Self {
        Self {
            path: path.to_string(),
            hint: hint.to_string(),
        }
    }
}

/// Validates the envelope and classifies the event.
///
/// `event_name` is the `x-github-event` header value; `payload` is the
/// parsed JSON body. Returns field errors when required structure is
/// missing; unknown-but-well-formed events classify as [`EventKind::Other`].
pub fn classify(
    delivery_id: &str,
    event_name: &str,
    payload: &Value,
) -> Result<WebhookEvent, Vec<FieldError>> {
    // Ping deliveries have no `action`; answer them before the envelope rules.
    if event_name == "ping" {
        return Ok(WebhookEvent {
            delivery_id: delivery_id.to_string(),
            kind: EventKind::Ping,
            action: String::new(),
            repo: repo_from(payload).unwrap_or_else(RepoRef::unknown),
            pull_number: None,
            diff_url: None,
            head_sha: None,
            comment_body: None,
            commenter: None,
        });
    }

    let mut errors = Vec::new();

    let action = match payload.get("action").and_then(Value::as_str) {
        Some(a) => a.to_string(),
        None => {
            errors.push(FieldError::new("action", "expected a string"));
            String::new()
        }
    };

    let repo = match repo_from(payload) {
        Some(r) => r,
        None => {
            errors.push(FieldError::new(
                "repository.full_name",
                "expected a string",
            ));
            RepoRef::unknown()
        }
    };

    let mut kind = EventKind::Other;
    let mut pull_number = None;
    let mut diff_url = None;
    let mut head_sha = None;
    let mut comment_body = None;
    let mut commenter = None;

    match event_name {
        "pull_request" if PR_ACTIONS.contains(&action.as_str()) => {
            kind = EventKind::PrChanged;

            pull_number = payload
                .pointer("/pull_request/number")
                .and_then(Value::as_u64);
            if pull_number.is_none() {
                errors.push(FieldError::new("pull_request.number", "expected an integer"));
            }

            diff_url = payload
                .pointer("/pull_request/diff_url")
                .and_then(Value::as_str)
                .map(str::to_string);
            if diff_url.is_none() {
                errors.push(FieldError::new("pull_request.diff_url", "expected a string"));
            }

            head_sha = payload
                .pointer("/pull_request/head/sha")
                .and_then(Value::as_str)
                .map(str::to_string);
            if head_sha.is_none() {
                errors.push(FieldError::new("pull_request.head.sha", "expected a string"));
            }
        }
        "issue_comment" if action == "created" => {
            // Only comments on pull requests qualify; plain issues are ignored.
            let on_pr = payload
                .pointer("/issue/pull_request")
                .map(|v| !v.is_null())
                .unwrap_or(false);
            let body = payload
                .pointer("/comment/body")
                .and_then(Value::as_str)
                .unwrap_or("");

            if on_pr && body.to_lowercase().contains(MENTION_TOKEN) {
                kind = EventKind::MentionComment;

                pull_number = payload.pointer("/issue/number").and_then(Value::as_u64);
                if pull_number.is_none() {
                    errors.push(FieldError::new("issue.number", "expected an integer"));
                }

                comment_body = Some(body.to_string());
                commenter = payload
                    .pointer("/comment/user/login")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
        }
        _ => {}
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(WebhookEvent {
        delivery_id: delivery_id.to_string(),
        kind,
        action,
        repo,
        pull_number,
        diff_url,
        head_sha,
        comment_body,
        commenter,
    })
}

fn repo_from(payload: &Value) -> Option<RepoRef> {
    let full_name = payload
        .pointer("/repository/full_name")
        .and_then(Value::as_str)?;
    let (owner, name) = full_name.split_once('/')?;
    let private = payload
        .pointer("/repository/private")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Some(RepoRef {
        owner: owner.to_string(),
        name: name.to_string(),
        full_name: full_name.to_string(),
        private,
    })
}

/// Produces a copy of the payload safe for logging: secret-shaped keys are
/// stripped and free-text fields (titles, bodies) truncated to 100 chars.
/// Called only after the ACK so logging cost never delays the response.
pub fn sanitize_for_log(payload: &Value) -> Value {
    fn walk(v: &Value) -> Value {
        match v {
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, val) in map {
                    let key_lower = k.to_ascii_lowercase();
                    if key_lower.contains("token")
                        || key_lower.contains("secret")
                        || key_lower.contains("authorization")
                    {
                        continue;
                    }
                    if (key_lower == "title" || key_lower == "body")
                        && let Value::String(s) = val
                    {
                        out.insert(k.clone(), Value::String(truncate_chars(s, LOG_TEXT_MAX)));
                        continue;
                    }
                    out.insert(k.clone(), walk(val));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(walk).collect()),
            other => other.clone(),
        }
    }
    walk(payload)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pr_payload(action: &str) -> Value {
        json!({
            "action": action,
            "repository": { "full_name": "alice/repo", "private": false },
            "pull_request": {
                "number": 7,
                "diff_url": "https://github.com/alice/repo/pull/7.diff",
                "head": { "sha": "abc123" }
            }
        })
    }

    #[test]
    fn pr_opened_classifies_as_changed() {
        let ev = classify("d1", "pull_request", &pr_payload("opened")).unwrap();
        assert_eq!(ev.kind, EventKind::PrChanged);
        assert_eq!(ev.pull_number, Some(7));
        assert_eq!(ev.head_sha.as_deref(), Some("abc123"));
        assert_eq!(ev.repo.full_name, "alice/repo");
        assert_eq!(ev.repo.owner, "alice");
        assert_eq!(ev.repo.name, "repo");
    }

    #[test]
    fn pr_synchronize_and_reopened_classify() {
        for action in ["synchronize", "reopened"] {
            let ev = classify("d", "pull_request", &pr_payload(action)).unwrap();
            assert_eq!(ev.kind, EventKind::PrChanged, "action {action}");
        }
    }

    #[test]
    fn pr_closed_is_other() {
        let ev = classify("d", "pull_request", &pr_payload("closed")).unwrap();
        assert_eq!(ev.kind, EventKind::Other);
    }

    #[test]
    fn missing_action_is_a_field_error() {
        let payload = json!({ "repository": { "full_name": "a/b" } });
        let errs = classify("d", "pull_request", &payload).unwrap_err();
        assert!(errs.iter().any(|e| e.path == "action"));
    }

    #[test]
    fn missing_repo_is_a_field_error() {
        let payload = json!({ "action": "opened" });
        let errs = classify("d", "pull_request", &payload).unwrap_err();
        assert!(errs.iter().any(|e| e.path == "repository.full_name"));
    }

    #[test]
    fn pr_changed_requires_number_diff_url_and_sha() {
        let payload = json!({
            "action": "opened",
            "repository": { "full_name": "a/b" },
            "pull_request": {}
        });
        let errs = classify("d", "pull_request", &payload).unwrap_err();
        let paths: Vec<&str> = errs.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"pull_request.number"));
        assert!(paths.contains(&"pull_request.diff_url"));
        assert!(paths.contains(&"pull_request.head.sha"));
    }

    #[test]
    fn ping_classifies_without_action() {
        let payload = json!({ "zen": "Keep it simple.", "hook_id": 1 });
        let ev = classify("d", "ping", &payload).unwrap();
        assert_eq!(ev.kind, EventKind::Ping);
    }

    fn comment_payload(body: &str, on_pr: bool) -> Value {
        let mut issue = json!({ "number": 12 });
        if on_pr {
            issue["pull_request"] = json!({ "url": "https://api.github.com/..." });
        }
        json!({
            "action": "created",
            "repository": { "full_name": "alice/repo" },
            "issue": issue,
            "comment": { "body": body, "user": { "login": "bob" } }
        })
    }

    #[test]
    fn mention_comment_classifies() {
        let ev = classify("d", "issue_comment", &comment_payload("hey @codecritics look", true))
            .unwrap();
        assert_eq!(ev.kind, EventKind::MentionComment);
        assert_eq!(ev.pull_number, Some(12));
        assert_eq!(ev.commenter.as_deref(), Some("bob"));
    }

    #[test]
    fn mention_is_case_insensitive() {
        let ev =
            classify("d", "issue_comment", &comment_payload("@CodeCritics please", true)).unwrap();
        assert_eq!(ev.kind, EventKind::MentionComment);
    }

    #[test]
    fn comment_without_mention_is_other() {
        let ev = classify("d", "issue_comment", &comment_payload("nice change", true)).unwrap();
        assert_eq!(ev.kind, EventKind::Other);
    }

    #[test]
    fn mention_on_plain_issue_is_other() {
        let ev = classify("d", "issue_comment", &comment_payload("@codecritics", false)).unwrap();
        assert_eq!(ev.kind, EventKind::Other);
    }

    #[test]
    fn edited_comment_is_other() {
        let mut payload = comment_payload("@codecritics", true);
        payload["action"] = json!("edited");
        let ev = classify("d", "issue_comment", &payload).unwrap();
        assert_eq!(ev.kind, EventKind::Other);
    }

    #[test]
    fn unknown_event_is_other() {
        let payload = json!({
            "action": "published",
            "repository": { "full_name": "a/b" }
        });
        let ev = classify("d", "release", &payload).unwrap();
        assert_eq!(ev.kind, EventKind::Other);
    }

    #[test]
    fn sanitize_truncates_and_strips() {
        let long_title = "t".repeat(300);
        let payload = json!({
            "action": "opened",
            "installation_token": "sekrit",
            "pull_request": { "title": long_title, "body": "short" },
            "comment": { "body": "b".repeat(200) }
        });
        let clean = sanitize_for_log(&payload);
        assert!(clean.get("installation_token").is_none());
        assert_eq!(
            clean.pointer("/pull_request/title").unwrap().as_str().unwrap().chars().count(),
            100
        );
        assert_eq!(
            clean.pointer("/comment/body").unwrap().as_str().unwrap().chars().count(),
            100
        );
        assert_eq!(clean.pointer("/pull_request/body").unwrap(), "short");
    }
}
