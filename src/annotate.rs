//! Findings from a formatter's rewritten output
//!
//! Shared by every format-and-diff tool: the original content is diffed
//! line-by-line against the tool's output with no context lines, and each
//! resulting hunk becomes one error-level finding.
use crate::finding::{Finding, Severity};
use similar::{ChangeTag, DiffOp, TextDiff};
use std::fmt::Write as _;
use std::io;
use std::path::Path;

pub fn synthesize(original: &str, transformed: &str, rule_id: &str) -> Vec<Finding> {
    if original.as_bytes() == transformed.as_bytes() {
        return Vec::new();
    }

    let old_lines = split_lines(original);
    let new_lines = split_lines(transformed);
    let diff = TextDiff::from_slices(&old_lines, &new_lines);

    // Differences in the final line terminator alone leave no hunks here;
    // such rewrites are not reported.
    diff.grouped_ops(0)
        .iter()
        .filter_map(|group| hunk_finding(&diff, group, rule_id))
        .collect()
}

/// Like [`synthesize`], reading the original content from `path`.
pub fn synthesize_file(path: impl AsRef<Path>, transformed: &str, rule_id: &str) -> io::Result<Vec<Finding>> {
    let original = std::fs::read(path)?;
    let original = String::from_utf8_lossy(&original);
    Ok(synthesize(&original, transformed, rule_id))
}

fn hunk_finding(
    diff: &TextDiff<'_, '_, '_, str>,
    group: &[DiffOp],
    rule_id: &str,
) -> Option<Finding> {
    let first = group.first()?;
    let last = group.last()?;
    let old_start = first.old_range().start;
    let old_len = last.old_range().end - old_start;
    let new_start = first.new_range().start;
    let new_len = last.new_range().end - new_start;

    let mut body = format!(
        "@@ -{} +{} @@\n",
        unified_range(old_start, old_len),
        unified_range(new_start, new_len)
    );
    let mut replacement = Vec::new();
    for op in group {
        for change in diff.iter_changes(op) {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => {
                    replacement.push(change.value());
                    '+'
                }
                ChangeTag::Equal => ' ',
            };
            let _ = writeln!(body, "{sign}{}", change.value());
        }
    }

    // Pure insertions sit after the preceding original line.
    let line = if old_len == 0 { old_start } else { old_start + 1 };
    let finding = Finding::new(rule_id, Severity::Error, line.max(1) as u32, body.trim_end());
    Some(finding.with_source(replacement.join("\n")))
}

/// `start,len` the way unified diff headers print it (1-based).
fn unified_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        n => format!("{},{n}", start + 1),
    }
}

/// Lines without their `\n` terminator; a trailing newline adds no line.
fn split_lines(text: &str) -> Vec<&str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    if body.is_empty() && text.len() <= 1 {
        return Vec::new();
    }
    body.split('\n').collect()
}
