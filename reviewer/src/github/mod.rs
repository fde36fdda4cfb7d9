//! GitHub REST client for the capability set the pipeline consumes.
//!
//! Endpoints used:
//! - GET  /user
//! - GET  /repos/{owner}/{repo}/pulls/{number}
//! - GET  /repos/{owner}/{repo}/pulls/{number}/files
//! - GET  /repos/{owner}/{repo}/compare/{base}...{head}   (diff media type)
//! - GET  /repos/{owner}/{repo}/issues/{number}/comments
//! - POST /repos/{owner}/{repo}/issues/{number}/comments
//! - POST /repos/{owner}/{repo}/pulls/{number}/reviews
//! - POST /repos/{owner}/{repo}/statuses/{sha}
//! - GET  /rate_limit
//!
//! One shared `reqwest::Client` with default headers; per-request timeouts
//! (comment posts 10 s, diff fetches 15 s). Non-2xx replies map to
//! `HostError` so callers can tell retriable from permanent failures.

pub mod types;
pub use types::*;

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::errors::{Error, HostError, ReviewResult};

/// Default API base for github.com deployments.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Commit status descriptions are capped by the host at 140 characters.
const STATUS_DESCRIPTION_MAX: usize = 140;

const POST_TIMEOUT: Duration = Duration::from_secs(10);
const DIFF_TIMEOUT: Duration = Duration::from_secs(15);
const GET_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin GitHub REST client; cheap to clone, safe for concurrent use.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_api: String,
}

impl GitHubClient {
    /// Constructs a client with auth and API headers preconfigured.
    pub fn new(base_api: impl Into<String>, token: &str) -> ReviewResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::Validation(format!("bad token: {e}")))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("code-critics/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            http,
            base_api: base_api.into().trim_end_matches('/').to_string(),
        })
    }

    /// Validates the configured token and returns the bot identity.
    pub async fn validate_identity(&self) -> ReviewResult<Identity> {
        let url = format!("{}/user", self.base_api);
        let resp = self.http.get(&url).timeout(GET_TIMEOUT).send().await?;
        let resp = check_status(resp).await?;

        #[derive(Deserialize)]
        struct User {
            login: String,
            id: u64,
        }
        let user: User = resp.json().await?;
        Ok(Identity {
            login: user.login,
            id: user.id,
        })
    }

    /// Fetches PR metadata (head/base SHAs, title, body, diff URL).
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> ReviewResult<PullRequest> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{number}",
            self.base_api,
            seg(owner),
            seg(repo)
        );
        let resp = self.http.get(&url).timeout(GET_TIMEOUT).send().await?;
        let resp = check_status(resp).await?;

        let raw: GitHubPull = resp.json().await?;
        Ok(PullRequest {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            head_sha: raw.head.sha,
            base_sha: raw.base.sha,
            diff_url: raw.diff_url,
        })
    }

    /// Lists changed files with their per-file patches.
    pub async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> ReviewResult<Vec<PrFile>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{number}/files?per_page=100",
            self.base_api,
            seg(owner),
            seg(repo)
        );
        let resp = self.http.get(&url).timeout(GET_TIMEOUT).send().await?;
        let resp = check_status(resp).await?;

        let raw: Vec<GitHubFile> = resp.json().await?;
        Ok(raw
            .into_iter()
            .map(|f| PrFile {
                filename: f.filename,
                status: f.status,
                additions: f.additions,
                deletions: f.deletions,
                patch: f.patch,
            })
            .collect())
    }

    /// Fetches the unified diff between two commits.
    pub async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base_sha: &str,
        head_sha: &str,
    ) -> ReviewResult<String> {
        let url = format!(
            "{}/repos/{}/{}/compare/{}...{}",
            self.base_api,
            seg(owner),
            seg(repo),
            seg(base_sha),
            seg(head_sha)
        );
        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "application/vnd.github.diff")
            .timeout(DIFF_TIMEOUT)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.text().await?)
    }

    /// Fetches a raw unified diff from an already-validated diff URL.
    pub async fn get_diff_url(&self, url: &str) -> ReviewResult<String> {
        debug!(%url, "fetching diff from envelope-supplied url");
        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github.diff")
            .timeout(DIFF_TIMEOUT)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.text().await?)
    }

    /// Lists PR-level (issue) comments, oldest first.
    pub async fn list_pr_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> ReviewResult<Vec<IssueComment>> {
        let url = format!(
            "{}/repos/{}/{}/issues/{number}/comments?per_page=100",
            self.base_api,
            seg(owner),
            seg(repo)
        );
        let resp = self.http.get(&url).timeout(GET_TIMEOUT).send().await?;
        let resp = check_status(resp).await?;

        let raw: Vec<GitHubComment> = resp.json().await?;
        Ok(raw
            .into_iter()
            .map(|c| IssueComment {
                id: c.id,
                body: c.body.unwrap_or_default(),
                user_login: c.user.map(|u| u.login).unwrap_or_default(),
                created_at: c.created_at,
            })
            .collect())
    }

    /// Posts a PR-level (issue) comment.
    pub async fn create_pr_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> ReviewResult<()> {
        let url = format!(
            "{}/repos/{}/{}/issues/{number}/comments",
            self.base_api,
            seg(owner),
            seg(repo)
        );
        let resp = self
            .http
            .post(&url)
            .timeout(POST_TIMEOUT)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Creates a review carrying inline comments in a single call.
    pub async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
        event: ReviewEvent,
        comments: &[InlineComment],
    ) -> ReviewResult<()> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{number}/reviews",
            self.base_api,
            seg(owner),
            seg(repo)
        );
        let resp = self
            .http
            .post(&url)
            .timeout(POST_TIMEOUT)
            .json(&serde_json::json!({
                "body": body,
                "event": event.as_str(),
                "comments": comments,
            }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Sets a commit status on the given SHA.
    pub async fn create_commit_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        state: StatusState,
        description: &str,
        context: &str,
    ) -> ReviewResult<()> {
        let url = format!(
            "{}/repos/{}/{}/statuses/{}",
            self.base_api,
            seg(owner),
            seg(repo),
            seg(sha)
        );
        let description: String = description.chars().take(STATUS_DESCRIPTION_MAX).collect();
        let resp = self
            .http
            .post(&url)
            .timeout(POST_TIMEOUT)
            .json(&serde_json::json!({
                "state": state.as_str(),
                "description": description,
                "context": context,
            }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Reads the current API quota.
    pub async fn rate_limit(&self) -> ReviewResult<RateLimitInfo> {
        let url = format!("{}/rate_limit", self.base_api);
        let resp = self.http.get(&url).timeout(GET_TIMEOUT).send().await?;
        let resp = check_status(resp).await?;

        #[derive(Deserialize)]
        struct RateLimitResp {
            rate: RateInner,
        }
        #[derive(Deserialize)]
        struct RateInner {
            limit: u64,
            remaining: u64,
            reset: u64,
        }
        let raw: RateLimitResp = resp.json().await?;
        Ok(RateLimitInfo {
            limit: raw.rate.limit,
            remaining: raw.rate.remaining,
            reset: raw.rate.reset,
        })
    }
}

/// Maps non-2xx replies to `HostError`, capturing the Retry-After hint on 429.
async fn check_status(resp: reqwest::Response) -> ReviewResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 429 {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        return Err(Error::Host(HostError::RateLimited { retry_after_secs }));
    }
    Err(Error::Host(HostError::from_status(status.as_u16())))
}


/// Percent-encodes a caller-influenced path segment before it is spliced
/// into a request URL.
fn seg(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// --- GitHub response shapes (subset of fields we actually use) ---

#[derive(Debug, Deserialize)]
struct GitHubPull {
    number: u64,
    title: String,
    body: Option<String>,
    diff_url: Option<String>,
    head: GitHubRefObject,
    base: GitHubRefObject,
}

#[derive(Debug, Deserialize)]
struct GitHubRefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<GitHubUser>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}
