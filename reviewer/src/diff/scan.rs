//! Right-side line-range scan over a unified diff.
//!
//! Walks `@@` hunk headers to compute, per file, the maximum visible line
//! number on the new (right) side. The findings parser clamps model-reported
//! lines against these ranges so inline comments always bind to a line that
//! exists in the diff.

use std::collections::HashMap;

/// Maps each changed file to the highest right-side line its hunks reach.
///
/// Tolerates headerless input (only `@@` lines required) and ignores
/// `\ No newline at end of file` markers, binary notes, and other prelude.
pub fn right_side_ranges(diff: &str) -> HashMap<String, u32> {
    let mut ranges: HashMap<String, u32> = HashMap::new();
    let mut current_file: Option<String> = None;

    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            current_file = rest
                .rfind(" b/")
                .map(|idx| rest[idx + 3..].to_string());
            continue;
        }
        if let Some(path) = line.strip_prefix("+++ b/") {
            current_file = Some(path.to_string());
            continue;
        }
        if line.starts_with("@@")
            && let Some((start, len)) = parse_new_range(line)
            && let Some(file) = &current_file
        {
            let end = start + len.saturating_sub(1);
            let entry = ranges.entry(file.clone()).or_insert(0);
            *entry = (*entry).max(end);
        }
    }

    ranges
}

/// Extracts `(+start, len)` from a hunk header like `@@ -3,4 +10,6 @@ fn x()`.
/// The length defaults to 1 when omitted (`+10` form).
fn parse_new_range(header: &str) -> Option<(u32, u32)> {
    let plus = header.find('+')?;
    let after = &header[plus + 1..];
    let start = leading_number(after)?;
    let rest = &after[digit_len(after)..];
    let len = match rest.strip_prefix(',') {
        Some(tail) => leading_number(tail)?,
        None => 1,
    };
    Some((start, len))
}

fn leading_number(s: &str) -> Option<u32> {
    let digits = &s[..digit_len(s)];
    digits.parse().ok()
}

fn digit_len(s: &str) -> usize {
    s.bytes().take_while(|b| b.is_ascii_digit()).count()
}
