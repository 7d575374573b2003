//! Shaping engine results into check-run updates
//!
//! Nothing here talks to the network: the output is the payload an external
//! client sends when it marks a check run completed.
use crate::capability::ToolCategory;
use crate::engine::{CheckReport, ToolRun};
use crate::finding::{Finding, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

/// Upper bound on the summary text, in characters.
pub const SUMMARY_LIMIT: usize = 60_000;
pub const TRUNCATION_MARKER: &str = "... truncated ...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    ActionRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationLevel {
    Notice,
    Warning,
    Failure,
}

impl From<Severity> for AnnotationLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => AnnotationLevel::Failure,
            Severity::Warning => AnnotationLevel::Warning,
            Severity::Off => AnnotationLevel::Notice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_column: Option<u32>,
    pub annotation_level: AnnotationLevel,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_details: Option<String>,
}

impl Annotation {
    /// `file` is used when the finding carries no path of its own. Returns
    /// `None` when neither names a file.
    pub fn from_finding(finding: &Finding, file: Option<&str>) -> Option<Self> {
        let path = finding.path.as_deref().or(file)?;
        // Check-run annotations are 1-based; file-level findings go on line 1.
        let line = finding.line.max(1);
        Some(Self {
            path: path.to_string(),
            start_line: line,
            end_line: line,
            start_column: (finding.column > 0).then_some(finding.column),
            annotation_level: finding.severity.into(),
            title: finding.rule_id.clone(),
            message: finding.message.clone(),
            raw_details: finding.source_code.clone().filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckRunOutput {
    pub name: String,
    pub conclusion: Conclusion,
    pub completed_at: DateTime<Utc>,
    pub title: String,
    pub summary: String,
    pub annotations: Vec<Annotation>,
}

/// Cap `text` at [`SUMMARY_LIMIT`] characters, ending with the marker when cut.
pub fn truncate_summary(text: &str) -> String {
    truncate_with_marker(text, SUMMARY_LIMIT)
}

fn truncate_with_marker(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = format!("\n{TRUNCATION_MARKER}");
    let keep = limit.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&suffix);
    out
}

/// One check-run update for `category`.
pub fn category_output(category: ToolCategory, runs: &[&ToolRun], threshold: Severity) -> CheckRunOutput {
    let failed: Vec<&&ToolRun> = runs.iter().filter(|r| r.failed()).collect();
    let findings: Vec<(&ToolRun, &Finding)> = runs
        .iter()
        .flat_map(|r| r.findings().iter().map(move |f| (*r, f)))
        .collect();
    let errors = findings.iter().filter(|(_, f)| f.severity == Severity::Error).count();
    let warnings = findings.iter().filter(|(_, f)| f.severity == Severity::Warning).count();

    let conclusion = if !failed.is_empty() {
        Conclusion::ActionRequired
    } else if findings.iter().any(|(_, f)| f.severity >= threshold) {
        Conclusion::Failure
    } else {
        Conclusion::Success
    };

    let title = match (failed.len(), findings.len()) {
        (0, 0) => "No problems found".to_string(),
        (0, n) => format!("{n} problem(s): {errors} error(s), {warnings} warning(s)"),
        (k, n) => format!("{k} tool run(s) failed, {n} problem(s) reported"),
    };

    let mut summary = String::new();
    for run in &failed {
        if let Err(e) = &run.outcome {
            let _ = writeln!(summary, "### {} failed{}", run.tool, describe_file(run));
            let _ = writeln!(summary, "{e}");
            if let Some(stderr) = e.stderr().filter(|s| !s.is_empty()) {
                let _ = writeln!(summary, "```\n{stderr}\n```");
            }
        }
    }
    for (run, finding) in &findings {
        let location = finding.path.as_deref().or(run.file.as_deref()).unwrap_or("(project)");
        let _ = writeln!(
            summary,
            "- {location}:{} [{}] {}: {}",
            finding.line, finding.severity, finding.rule_id, finding.message
        );
    }

    let annotations = findings
        .iter()
        .filter_map(|(run, f)| Annotation::from_finding(f, run.file.as_deref()))
        .collect();

    CheckRunOutput {
        name: format!("lint/{category}"),
        conclusion,
        completed_at: Utc::now(),
        title,
        summary: truncate_summary(&summary),
        annotations,
    }
}

fn describe_file(run: &ToolRun) -> String {
    run.file.as_deref().map(|f| format!(" on `{f}`")).unwrap_or_default()
}

/// One update per category that ran anything, in category order.
pub fn check_outputs(report: &CheckReport, threshold: Severity) -> Vec<CheckRunOutput> {
    report
        .by_category()
        .into_iter()
        .map(|(category, runs)| category_output(category, &runs, threshold))
        .collect()
}
