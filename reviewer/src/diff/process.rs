//! Diff shaping: file-boundary chunking, extension filtering, and the
//! size-adaptive skip policy.
//!
//! Invariants:
//! - `split_chunks` concatenates back to the input byte-for-byte, and every
//!   chunk starts at a `diff --git ` boundary or at index 0.
//! - `filter_by_extension` is idempotent.

use tracing::debug;

/// Greedy packing budget for one chunk, in bytes.
pub const CHUNK_BYTE_BUDGET: usize = 50_000;

/// Splits a unified diff into per-file segments at `diff --git ` headers.
///
/// A leading segment before the first header (rare, but providers prepend
/// stat lines) is returned as its own segment so concatenation stays exact.
fn file_segments(diff: &str) -> Vec<&str> {
    const BOUNDARY: &str = "diff --git ";

    let mut starts = Vec::new();
    if diff.starts_with(BOUNDARY) {
        starts.push(0);
    }
    let mut from = 0;
    while let Some(pos) = diff[from..].find(&format!("\n{BOUNDARY}")) {
        starts.push(from + pos + 1);
        from += pos + 1;
    }

    if starts.is_empty() {
        if diff.is_empty() {
            return Vec::new();
        }
        return vec![diff];
    }

    let mut segments = Vec::with_capacity(starts.len() + 1);
    if starts[0] > 0 {
        segments.push(&diff[..starts[0]]);
    }
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(diff.len());
        segments.push(&diff[start..end]);
    }
    segments
}

/// Splits the diff into chunks of at most `budget` bytes without ever
/// splitting inside a file, unless a single file already exceeds the budget
/// (that file then forms its own chunk).
pub fn split_chunks(diff: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in file_segments(diff) {
        if !current.is_empty() && current.len() + segment.len() > budget {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(segment);
        if current.len() > budget {
            // Oversized single file: flush it alone.
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// First filename of a file segment: the `b/` side of the `diff --git `
/// header, falling back to the `+++` line for headerless segments.
fn segment_filename(segment: &str) -> Option<&str> {
    let first_line = segment.lines().next()?;
    if let Some(rest) = first_line.strip_prefix("diff --git ")
        && let Some(idx) = rest.rfind(" b/")
    {
        return Some(&rest[idx + 3..]);
    }
    segment
        .lines()
        .find_map(|l| l.strip_prefix("+++ b/").or_else(|| l.strip_prefix("+++ ")))
        .filter(|p| *p != "/dev/null")
}

fn extension_allowed(filename: &str, extensions: &[String]) -> bool {
    let lower = filename.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.to_lowercase()))
}

/// Keeps only file segments whose filename ends in an allowed extension.
/// Segments with no detectable filename are dropped.
pub fn filter_by_extension(diff: &str, extensions: &[String]) -> String {
    file_segments(diff)
        .into_iter()
        .filter(|seg| {
            segment_filename(seg).is_some_and(|name| extension_allowed(name, extensions))
        })
        .collect()
}

/// Outcome of the size-adaptive policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeDecision {
    /// Review this text; `filtered` records whether the extension filter ran.
    Proceed { diff: String, filtered: bool },
    /// Filtering removed everything reviewable.
    NoSupportedFiles,
    /// Even the filtered diff is beyond the hard ceiling.
    TooLarge { size: usize },
}

/// Applies the policy: small diffs pass untouched; oversized diffs are
/// extension-filtered and re-measured against `max_size * multiplier`.
pub fn apply_size_policy(
    diff: &str,
    max_size: usize,
    multiplier: f64,
    extensions: &[String],
) -> SizeDecision {
    if diff.len() <= max_size {
        return SizeDecision::Proceed {
            diff: diff.to_string(),
            filtered: false,
        };
    }

    debug!(
        size = diff.len(),
        max_size, "diff over threshold, applying extension filter"
    );
    let filtered = filter_by_extension(diff, extensions);
    if filtered.trim().is_empty() {
        return SizeDecision::NoSupportedFiles;
    }

    let ceiling = (max_size as f64 * multiplier) as usize;
    if filtered.len() > ceiling {
        return SizeDecision::TooLarge {
            size: filtered.len(),
        };
    }

    SizeDecision::Proceed {
        diff: filtered,
        filtered: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_diff(path: &str, body_lines: usize) -> String {
        let mut s = format!(
            "diff --git a/{path} b/{path}\nindex 000..111 100644\n--- a/{path}\n+++ b/{path}\n@@ -1,1 +1,{body_lines} @@\n"
        );
        for i in 0..body_lines {
            s.push_str(&format!("+line {i}\n"));
        }
        s
    }

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn chunks_concatenate_to_original() {
        let diff = format!("{}{}{}", file_diff("a.rs", 5), file_diff("b.py", 3), file_diff("c.md", 1));
        for budget in [1, 50, 200, 100_000] {
            let chunks = split_chunks(&diff, budget);
            assert_eq!(chunks.concat(), diff, "budget {budget}");
        }
    }

    #[test]
    fn every_chunk_starts_at_a_boundary() {
        let diff = format!("{}{}", file_diff("a.rs", 40), file_diff("b.rs", 40));
        let chunks = split_chunks(&diff, 300);
        for c in &chunks {
            assert!(c.starts_with("diff --git "), "chunk start: {:?}", &c[..20]);
        }
    }

    #[test]
    fn small_files_pack_together() {
        let diff = format!("{}{}", file_diff("a.rs", 1), file_diff("b.rs", 1));
        let chunks = split_chunks(&diff, 100_000);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn oversized_file_forms_its_own_chunk() {
        let big = file_diff("big.rs", 200);
        let small = file_diff("small.rs", 1);
        let diff = format!("{small}{big}");
        let chunks = split_chunks(&diff, small.len() + 10);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().any(|c| c.contains("big.rs") && c.len() > small.len() + 10));
        assert_eq!(chunks.concat(), diff);
    }

    #[test]
    fn empty_diff_yields_no_chunks() {
        assert!(split_chunks("", 100).is_empty());
    }

    #[test]
    fn diff_without_boundaries_is_one_chunk() {
        let raw = "@@ -1,1 +1,1 @@\n+x\n";
        let chunks = split_chunks(raw, 5);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], raw);
    }

    #[test]
    fn prelude_is_preserved() {
        let diff = format!("Binary note\n{}", file_diff("a.rs", 1));
        let chunks = split_chunks(&diff, 100_000);
        assert_eq!(chunks.concat(), diff);
    }

    #[test]
    fn filter_keeps_allowed_extensions() {
        let diff = format!("{}{}", file_diff("src/lib.rs", 2), file_diff("image.png", 2));
        let kept = filter_by_extension(&diff, &exts(&[".rs"]));
        assert!(kept.contains("src/lib.rs"));
        assert!(!kept.contains("image.png"));
    }

    #[test]
    fn filter_is_case_insensitive() {
        let diff = file_diff("README.MD", 1);
        let kept = filter_by_extension(&diff, &exts(&[".md"]));
        assert!(kept.contains("README.MD"));
    }

    #[test]
    fn filter_is_idempotent() {
        let diff = format!(
            "{}{}{}",
            file_diff("a.rs", 3),
            file_diff("b.bin", 3),
            file_diff("c.py", 3)
        );
        let e = exts(&[".rs", ".py"]);
        let once = filter_by_extension(&diff, &e);
        let twice = filter_by_extension(&once, &e);
        assert_eq!(once, twice);
    }

    #[test]
    fn filter_handles_renames_via_b_side() {
        let seg = "diff --git a/old_name.txt b/new_name.rs\n--- a/old_name.txt\n+++ b/new_name.rs\n@@ -1 +1 @@\n+x\n";
        let kept = filter_by_extension(seg, &exts(&[".rs"]));
        assert_eq!(kept, seg);
    }

    #[test]
    fn policy_passes_small_diffs_untouched() {
        let diff = file_diff("a.bin", 2);
        match apply_size_policy(&diff, 100_000, 1.5, &exts(&[".rs"])) {
            SizeDecision::Proceed { diff: d, filtered } => {
                assert_eq!(d, diff);
                assert!(!filtered);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn policy_filters_oversized_diffs() {
        let diff = format!("{}{}", file_diff("a.rs", 10), file_diff("b.bin", 200));
        let max = file_diff("a.rs", 10).len() + 50;
        match apply_size_policy(&diff, max, 1.5, &exts(&[".rs"])) {
            SizeDecision::Proceed { diff: d, filtered } => {
                assert!(filtered);
                assert!(d.contains("a.rs"));
                assert!(!d.contains("b.bin"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn policy_skips_when_nothing_supported() {
        let diff = file_diff("huge.bin", 100);
        match apply_size_policy(&diff, 10, 1.5, &exts(&[".rs"])) {
            SizeDecision::NoSupportedFiles => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn policy_skips_when_still_too_large() {
        let diff = file_diff("huge.rs", 300);
        match apply_size_policy(&diff, 1000, 1.5, &exts(&[".rs"])) {
            SizeDecision::TooLarge { size } => assert!(size > 1500),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
