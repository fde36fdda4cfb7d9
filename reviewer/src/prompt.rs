//! Prompt assembly for the review call.
//!
//! One fixed system prompt plus user messages carrying the diff fenced as a
//! diff block. Diffs beyond the chunk budget are split at file boundaries
//! into consecutive user messages so no file is ever cut mid-hunk.

use llm_gateway::ChatMessage;

use crate::diff::process::{CHUNK_BYTE_BUDGET, split_chunks};

/// Fixed reviewer instructions sent with every completion call.
pub const SYSTEM_PROMPT: &str = "\
You are an expert code reviewer and security auditor. Analyze the provided \
pull request diff and report only issues that matter: critical bugs, security \
vulnerabilities, code quality problems, poor testability, and missing or \
misleading documentation.

For every issue, output a block with exactly these fields:

**Location**: path/to/file.ext:line
**Issue Type**: short category of the problem
**Description**: what is wrong and why it matters
**Severity**: Critical | High | Medium | Low
**Suggested Change**: a concrete fix or improvement

Separate consecutive issue blocks with a line containing only:
---

Rules:
- Use the new-side (right-hand) line numbers from the diff in Location.
- Report real defects only; skip style nits a formatter would fix.
- Do not repeat the diff back or add commentary outside the blocks.
- If there are no significant issues, reply with exactly:
No significant issues found. Good job!";

/// Builds the ordered user messages for a diff.
pub fn build_messages(diff: &str) -> Vec<ChatMessage> {
    build_messages_with_budget(diff, CHUNK_BYTE_BUDGET)
}

fn build_messages_with_budget(diff: &str, budget: usize) -> Vec<ChatMessage> {
    let chunks = split_chunks(diff, budget);
    let total = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let header = if total > 1 {
                format!("Review the following changes (part {} of {total}):", i + 1)
            } else {
                "Review the following changes:".to_string()
            };
            ChatMessage::user(format!("{header}\n\n```diff\n{chunk}\n```"))
        })
        .collect()
}
