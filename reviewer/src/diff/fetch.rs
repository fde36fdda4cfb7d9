//! Diff retrieval with SSRF-guarded use of caller-supplied diff URLs.
//!
//! The envelope's `diff_url` is preferred for efficiency, but a webhook
//! payload is attacker-influenced even when the signature checks out (a
//! compromised repo can emit arbitrary URLs). Before use the URL must pass:
//! scheme http(s), host on a github domain (label-anchored suffix match),
//! and a path that names the expected `owner/repo` and `pull/<number>`.
//! Anything else falls back to the host API's compare endpoint.

use reqwest::Url;
use tracing::{debug, warn};

use crate::errors::ReviewResult;
use crate::github::{GitHubClient, PrFile, PullRequest, types::RepoRef};

/// Host suffixes a diff URL may point at.
const ALLOWED_HOSTS: &[&str] = &["github.com", "githubusercontent.com"];

/// Returns true when `raw_url` may be fetched directly for this PR.
pub fn validate_diff_url(raw_url: &str, owner: &str, repo: &str, number: u64) -> bool {
    let Ok(url) = Url::parse(raw_url) else {
        return false;
    };

    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let Some(host) = url.host_str() else {
        return false;
    };
    let host_ok = ALLOWED_HOSTS
        .iter()
        .any(|allowed| host == *allowed || host.ends_with(&format!(".{allowed}")));
    if !host_ok {
        return false;
    }

    let path = url.path();
    path.contains(&format!("{owner}/{repo}")) && path.contains(&format!("pull/{number}"))
}

/// Fetches the unified diff for a PR.
///
/// A validated `diff_url` is fetched directly; an invalid or absent one
/// silently degrades to `compare_commits(base..head)`. Fetch errors are not
/// masked by the fallback; the orchestrator maps them to transient or
/// permanent failures.
pub async fn fetch_diff(
    client: &GitHubClient,
    repo: &RepoRef,
    pull: &PullRequest,
) -> ReviewResult<String> {
    if let Some(url) = pull.diff_url.as_deref() {
        if validate_diff_url(url, &repo.owner, &repo.name, pull.number) {
            return client.get_diff_url(url).await;
        }
        warn!(
            repo = %repo.full_name,
            pull = pull.number,
            "diff url failed validation, falling back to compare"
        );
    } else {
        debug!(repo = %repo.full_name, pull = pull.number, "no diff url in envelope, using compare");
    }

    client
        .compare_commits(&repo.owner, &repo.name, &pull.base_sha, &pull.head_sha)
        .await
}

/// Reassembles a unified diff from per-file patches.
///
/// Some providers return an empty body for freshly-pushed heads while the
/// file list already carries patches; this rebuilds the `diff --git `
/// structure the downstream chunker and scanner expect. Binary files (no
/// patch) are skipped.
pub fn diff_from_files(files: &[PrFile]) -> String {
    let mut out = String::new();
    for f in files {
        let Some(patch) = f.patch.as_deref() else {
            continue;
        };
        out.push_str(&format!(
            "diff --git a/{0} b/{0}\n--- a/{0}\n+++ b/{0}\n",
            f.filename
        ));
        out.push_str(patch);
        if !patch.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
